use core::panic::PanicInfo;

use crate::hal::halt;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("\n[kernel] PANIC!");
    if let Some(location) = info.location() {
        println!(
            "[kernel] panicked at {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
    }
    println!("[kernel] {}", info.message());
    halt()
}
