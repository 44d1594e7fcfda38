//! Device inventory.

use idsdash_core::Dashboard;
use idsdash_core::api::models::Device;
use tabled::Tabled;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Vendor")]
    vendor: String,
    #[tabled(rename = "Open ports")]
    ports: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        let ports = d.ports();
        Self {
            ip: d.ip.clone(),
            name: output::or_dash(d.name.as_deref()),
            mac: output::or_dash(d.mac.as_deref()),
            vendor: output::or_dash(d.vendor.as_deref()),
            ports: if ports.is_empty() {
                "-".into()
            } else {
                ports
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            },
            risk: output::or_dash(d.risk.as_deref()),
            last_seen: output::or_dash(d.last_seen.as_deref()),
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = dashboard.api();
    match args.command {
        DevicesCommand::List => {
            let devices = api.list_devices().await?;
            let out = output::render_list(global.output, &devices, |x| DeviceRow::from(x), |d| d.ip.clone());
            output::print_output(&out, global.quiet);
        }
        DevicesCommand::Rename { ip, name } => {
            api.rename_device(&ip, &name).await?;
            output::status(&format!("Renamed {ip} to '{name}'"), global.quiet);
        }
    }
    Ok(())
}
