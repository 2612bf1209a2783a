use anyhow::Result;

use hostcmd_lib::platform::Platform;
use hostcmd_lib::transport::TransportConfig;

use crate::output::{OutputFormat, print_json, print_stat};

pub fn cmd_info(format: OutputFormat) -> Result<()> {
  let platform = Platform::current();
  let transport = TransportConfig::default();

  if format.is_json() {
    return print_json(&serde_json::json!({
      "platform": platform.map(|p| p.triple()),
      "shell": platform.map(|p| p.local_shell()),
      "ssh": transport.ssh_binary,
      "version": env!("CARGO_PKG_VERSION"),
    }));
  }

  println!("System:");
  match platform {
    Some(platform) => {
      print_stat("Platform", &platform.triple());
      print_stat("Shell", platform.local_shell());
    }
    None => println!("Could not detect platform."),
  }
  print_stat("ssh", &transport.ssh_binary);
  Ok(())
}
