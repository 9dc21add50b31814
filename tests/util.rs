#[path = "util/cores.rs"]
mod cores;
#[path = "util/sizes.rs"]
mod sizes;
