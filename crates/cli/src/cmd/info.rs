use pyport_lib::config::{DEFAULT_PYTHON, DEFAULT_PYTHON_VERSION};
use pyport_lib::platform::platform_key;

pub fn cmd_info() {
  println!("System:");
  match platform_key() {
    Some(key) => println!("Platform: {}", key),
    _ => println!("Could not detect platform."),
  }
  println!("Default python: {} ({})", DEFAULT_PYTHON, DEFAULT_PYTHON_VERSION);
}
