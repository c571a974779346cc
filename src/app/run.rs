use std::process::ExitCode;

use anyhow::Context;
use tracing::debug;

use crate::aws::{self, BASH_STS_ALIAS};
use crate::config::{Environment, PalConfig, VaultSettings};
use crate::error::Error;
use crate::kubeconfig;
use crate::timer;
use crate::token;
use crate::types::{Cli, Command, ExportTarget, SwitchTarget, WriteTarget};
use crate::vault::VaultClient;

const PROGRAM: &str = env!("CARGO_PKG_NAME");

pub fn version_line() -> String {
    format!(
        "{} {} (commit: {}), platform {}/{}",
        PROGRAM,
        env!("CARGO_PKG_VERSION"),
        option_env!("VAULTPAL_COMMIT").unwrap_or("unknown"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

fn vault_client(env: &Environment, config: &PalConfig) -> crate::error::Result<VaultClient> {
    let settings = VaultSettings::resolve(env)?;
    let client = VaultClient::new(
        &settings.address,
        &settings.token,
        Some(config.request_timeout()),
    )
    .map_err(|e| Error::vault("error creating vault api client", e))?;
    debug!("using vault at {}", client.address());
    Ok(client)
}

/// Configuration for the invoked command. The timer runs on every prompt
/// redraw, so it falls back to the defaults rather than failing.
fn load_config(cli: &Cli, env: &Environment) -> anyhow::Result<PalConfig> {
    match PalConfig::load(cli.config.as_deref(), env.home.as_deref()) {
        Ok(config) => Ok(config),
        Err(e) if matches!(cli.command, Command::Timer(_)) => {
            debug!("timer: using default configuration: {}", e);
            Ok(PalConfig::default())
        }
        Err(e) => Err(anyhow::Error::from(e).context("cannot load configuration")),
    }
}

/// Extra advice for failures caused by an unreachable secrets service.
pub fn hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<Error>())
        .any(Error::is_network)
        .then_some("check VAULT_ADDR and that the vault server is reachable (VPN?)")
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let env = Environment::from_process();
    let config = load_config(&cli, &env)?;

    match cli.command {
        Command::Timer(args) => {
            let code = timer::run_timer(args.into(), &env, &config, PROGRAM).await?;
            return Ok(code);
        }

        Command::Version => println!("{}", version_line()),

        Command::Write { target } => match target {
            WriteTarget::Kubeconfig { cluster, role } => {
                let client = vault_client(&env, &config)?;
                kubeconfig::write_kubeconfig(&client, &env, &config, &cluster, &role)
                    .await
                    .with_context(|| format!("cannot write kubeconfig for cluster [{}]", cluster))?;
            }
            WriteTarget::Awscreds { role, profile } => {
                let client = vault_client(&env, &config)?;
                aws::write_credentials(&client, &env, &config, &role, &profile).await?;
            }
        },

        Command::Export { target } => match target {
            ExportTarget::Awssts { alias: true, .. } => println!("{}", BASH_STS_ALIAS),
            ExportTarget::Awssts {
                role, path, shell, ..
            } => {
                let client = vault_client(&env, &config)?;
                let engine = path.as_deref().unwrap_or(&config.aws_engine);
                let exports = aws::export_sts(
                    &client,
                    engine,
                    role.as_deref(),
                    shell.unwrap_or_default(),
                )
                .await?;
                println!("{}", exports);
            }
            ExportTarget::Awsconsole {
                role,
                suppress_open,
                path,
            } => {
                let client = vault_client(&env, &config)?;
                let engine = path.as_deref().unwrap_or(&config.aws_engine);
                let url =
                    aws::console_url(&client, &env, &config, engine, &role, suppress_open).await?;
                println!("{}", url);
            }
        },

        Command::Switch {
            target: SwitchTarget::Role { role },
        } => {
            let client = vault_client(&env, &config)?;
            let helper = env.token_helper()?;
            token::switch_role(&client, &helper, &role)
                .await
                .context("cannot create role token")?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
