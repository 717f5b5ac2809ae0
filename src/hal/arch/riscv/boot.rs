//! Reset entry: set up the boot stack and jump to `rust_main`

use core::arch::global_asm;

/// Stack used by `rust_main` until the first task is entered
pub const BOOT_STACK_SIZE: usize = 4096;

global_asm!(
    "
    .section .text.entry
    .globl _start
_start:
    la sp, boot_stack_top
    call rust_main
1:
    j 1b

    .section .bss.stack
    .align 4
    .globl boot_stack_lower_bound
boot_stack_lower_bound:
    .space {size}
    .globl boot_stack_top
boot_stack_top:
    ",
    size = const BOOT_STACK_SIZE,
);

/// Zero the `.bss` section
pub fn clear_bss() {
    extern "C" {
        fn sbss();
        fn ebss();
    }
    unsafe {
        core::slice::from_raw_parts_mut(
            sbss as *const () as usize as *mut u8,
            ebss as *const () as usize - sbss as *const () as usize,
        )
        .fill(0);
    }
}
