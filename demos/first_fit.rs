use std::{io::Read, ptr};

use firstfit::{FirstFit, HEADER_SIZE, Sbrk};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how the program break moves.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    Sbrk::current_break(),
  );
}

fn print_heap(allocator: &FirstFit<Sbrk>) {
  print!("{allocator}");
}

fn main() {
  env_logger::init();

  let mut allocator = FirstFit::new(Sbrk);
  println!("Header size: {HEADER_SIZE} bytes");

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Two allocations on an empty heap: each one grows the break by
  //    size + HEADER_SIZE and is appended to the block list.
  // --------------------------------------------------------------------
  let first = allocator.acquire(10).unwrap().unwrap();
  let second = allocator.acquire(20).unwrap().unwrap();
  println!("\n[1] acquire(10) = {first:?}, acquire(20) = {second:?}");
  print_heap(&allocator);
  print_program_break("after growth");

  unsafe { ptr::write_bytes(second.as_ptr(), 0xAB, 20) };
  println!("[1] Initialized second block with 0xAB");

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Releasing the first block leaves it free; its neighbour is in use,
  //    so nothing merges.
  // --------------------------------------------------------------------
  allocator.release(first.as_ptr()).unwrap();
  println!("\n[2] release(first)");
  print_heap(&allocator);

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Releasing the second block merges both into one free block of
  //    10 + 20 + HEADER_SIZE bytes.
  // --------------------------------------------------------------------
  allocator.release(second.as_ptr()).unwrap();
  println!("\n[3] release(second)");
  print_heap(&allocator);

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) A small request reuses the merged block and splits off the rest
  //    when it is large enough to hold another header.
  // --------------------------------------------------------------------
  let small = allocator.acquire(4).unwrap().unwrap();
  println!(
    "\n[4] acquire(4) = {small:?}, reused first block? {}",
    if small == first { "Yes" } else { "No" }
  );
  print_heap(&allocator);
  print_program_break("after reuse");

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) A large block does not fit anywhere, so the heap grows again.
  // --------------------------------------------------------------------
  print_program_break("before large acquire");
  let big = allocator.acquire(64 * 1024).unwrap().unwrap();
  println!("\n[5] acquire(64 KiB) = {big:?}");
  print_heap(&allocator);
  print_program_break("after large acquire");

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) End of demo. The heap never shrinks; the OS reclaims it at exit.
  // --------------------------------------------------------------------
  allocator.release(small.as_ptr()).unwrap();
  allocator.release(big.as_ptr()).unwrap();
  println!("\n[6] Released everything");
  print_heap(&allocator);
}
