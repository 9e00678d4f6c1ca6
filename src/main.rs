use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use wp_topic_provision::BootstrapConf;
use wp_topic_provision::connect::ConnectorRegistrar;
use wp_topic_provision::kafka::{ProvisioningRegistry, Provisioner};

/// Registers the JDBC source connector and provisions the configured topics.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file; built-in local defaults are used when omitted.
    #[arg(short, long, env = "WP_PROVISION_CONFIG")]
    config: Option<PathBuf>,

    /// Only provision topics.
    #[arg(long)]
    skip_connector: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let conf = match &args.config {
        Some(path) => BootstrapConf::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => {
            let conf = BootstrapConf::default();
            conf.check()?;
            conf
        }
    };

    if !args.skip_connector {
        let registrar = ConnectorRegistrar::new(&conf.connect)?;
        let outcome = registrar
            .ensure_connector_registered(&conf.connector)
            .await
            .with_context(|| format!("register connector {}", conf.connector.name))?;
        log::info!("connector {}: {:?}", conf.connector.name, outcome);
    }

    let provisioner = Provisioner::from_conf(&conf, ProvisioningRegistry::shared())?;
    for topic in &conf.topics {
        let status = provisioner
            .ensure_topic(topic)
            .await
            .with_context(|| format!("provision topic {}", topic.name))?;
        log::info!("topic {}: {:?}", topic.name, status);
    }
    Ok(())
}
