//! Service catalog listing: `docbot services`.

use anyhow::Result;

use docbot::config::DocbotConfig;

use super::load_catalog;

pub fn cmd_services(config: &DocbotConfig) -> Result<()> {
    let services = load_catalog(config)?.all()?;

    if services.is_empty() {
        println!("No services in {}", config.catalog_file().display());
        return Ok(());
    }
    for service in &services {
        println!("{:>3}. {} - {} SAR", service.index, service.name, service.price);
    }
    Ok(())
}
