use car_registry::config::deployment::ContractArtifact;
use car_registry::config::manifest_config::{
    default_deployment_dir, DEFAULT_CHAIN_ID, DEFAULT_GATEWAY_HOST, DEFAULT_GATEWAY_PORT,
    DEFAULT_MODULE, DEFAULT_TIMEOUT_SECONDS,
};
use car_registry::config::{Commands, DeployArgs, ServeArgs};
use car_registry::core::ContractReader;
use car_registry::domain::model::CallId;
use car_registry::domain::ports::Journal;
use car_registry::utils::logger;
use car_registry::utils::validation::{validate_rpc_url, Validate};
use car_registry::{
    gateway, CliConfig, DeploymentArtifacts, FileJournal, GatewayState, InMemoryLedger,
    ManifestConfig, ManifestRunner, RegistryError, Result, RouteTable, RpcContractClient,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting car-registry");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let outcome = match cli.command {
        Commands::Plan { config } => plan(&config).await,
        Commands::Deploy(args) => deploy(args).await,
        Commands::Serve(args) => serve(args).await,
    };

    if let Err(e) = outcome {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ car-registry failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn load_config(
    path: &str,
    rpc_url: Option<String>,
    deployment_dir: Option<String>,
) -> Result<ManifestConfig> {
    tracing::info!("📁 Loading manifest from: {}", path);
    let mut config = ManifestConfig::from_file(path)?;
    config.apply_overrides(rpc_url, deployment_dir);

    // 驗證配置
    config.validate()?;
    tracing::info!("✅ Manifest loaded and validated successfully");
    Ok(config)
}

async fn plan(config_path: &str) -> Result<()> {
    let config = load_config(config_path, None, None)?;
    let manifest = config.to_manifest()?;
    let artifacts = DeploymentArtifacts::new(config.deployment_dir());
    let journal = FileJournal::open(artifacts.journal_path())?;

    println!("📋 Manifest Summary:");
    println!("  Future: {}", config.future_id());
    println!("  Vehicle: {}", config.vehicle.vin);
    println!("  Owner account: {}", config.deployment.from_account);
    println!("  Deployment dir: {}", artifacts.dir().display());
    println!(
        "  Target: {}",
        config.rpc_url().unwrap_or("(none, use --local-state)")
    );
    println!();

    let mut pending = 0;
    for id in manifest.call_ids() {
        let done = journal.lookup(&id).await?.is_some();
        if !done {
            pending += 1;
        }
        let description = manifest
            .commands()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.operation.to_string())
            .unwrap_or_else(|| format!("deploy {}", manifest.deployment().contract));
        println!(
            "  {} {:<24} {}",
            if done { "✅" } else { "⏳" },
            id,
            description
        );
    }

    println!();
    println!(
        "🔍 Dry run complete: {} of {} calls pending.",
        pending,
        manifest.len() + 1
    );
    Ok(())
}

async fn deploy(args: DeployArgs) -> Result<()> {
    let config = load_config(&args.config, args.rpc_url, args.deployment_dir)?;
    let manifest = config.to_manifest()?;
    let future_id = config.future_id();
    let artifacts = DeploymentArtifacts::new(config.deployment_dir());
    let journal = FileJournal::open(artifacts.journal_path())?;

    tracing::info!(
        "📒 Journal {} has {} completed calls",
        journal.path().display(),
        journal.len()
    );

    let report = match args.local_state {
        Some(state_path) => {
            tracing::info!("🧪 Using local ledger snapshot {}", state_path);
            let ledger = InMemoryLedger::load(&state_path)?;
            let artifact = ContractArtifact {
                contract_name: config.deployment.contract.clone(),
                abi: InMemoryLedger::interface()?,
                bytecode: None,
            };
            if artifacts.write_artifact_if_missing(&future_id, &artifact)? {
                tracing::info!("📝 Wrote artifact {}", artifacts.artifact_path(&future_id).display());
            }

            let runner = ManifestRunner::new(ledger.clone(), journal);
            let outcome = runner.run(&manifest, None).await;
            // 失敗時也保存快照，使其與日誌一致
            ledger.save(&state_path)?;
            outcome?
        }
        None => {
            let rpc_url = config
                .rpc_url()
                .ok_or_else(|| RegistryError::MissingConfigError {
                    field: "network.rpc_url".to_string(),
                })?;
            let client = RpcContractClient::new(rpc_url, config.timeout())?;
            let bytecode = artifacts.bytecode(&future_id)?;

            ManifestRunner::new(client, journal)
                .run(&manifest, bytecode)
                .await?
        }
    };

    artifacts.record_deployed_address(&future_id, &report.address)?;
    tracing::debug!("Run summary: {:?}", report.summary());

    println!("✅ Manifest applied successfully!");
    println!("📍 {} deployed at {}", future_id, report.address);
    println!(
        "📊 Submitted: {}, skipped: {}, duration: {:?}",
        report.submitted.len(),
        report.skipped.len(),
        report.duration
    );
    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Some(load_config(path, None, None)?),
        None => None,
    };

    let deployment_dir = args
        .deployment_dir
        .clone()
        .or_else(|| {
            config
                .as_ref()
                .map(|c| c.deployment_dir().to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| default_deployment_dir(DEFAULT_CHAIN_ID));
    let future_id = args
        .future_id
        .clone()
        .map(CallId::new)
        .or_else(|| config.as_ref().map(|c| c.future_id()))
        .unwrap_or_else(|| CallId::new(format!("{}#{}", DEFAULT_MODULE, DEFAULT_MODULE)));

    // 位址與介面描述缺一不可
    let artifacts = DeploymentArtifacts::new(&deployment_dir);
    let address = artifacts.deployed_address(&future_id)?;
    let artifact = artifacts.load_artifact(&future_id)?;
    let routes = RouteTable::build(address.as_str(), artifact.abi)?;

    let reader: Arc<dyn ContractReader> = match &args.local_state {
        Some(state_path) => {
            if !Path::new(state_path).exists() {
                return Err(RegistryError::InterfaceError {
                    message: format!("ledger snapshot {} not found", state_path),
                });
            }
            Arc::new(InMemoryLedger::load(state_path)?)
        }
        None => {
            let rpc_url = args
                .rpc_url
                .clone()
                .or_else(|| config.as_ref().and_then(|c| c.rpc_url().map(str::to_string)))
                .ok_or_else(|| RegistryError::MissingConfigError {
                    field: "network.rpc_url".to_string(),
                })?;
            validate_rpc_url("--rpc-url", &rpc_url)?;
            let timeout = config
                .as_ref()
                .map(|c| c.timeout())
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS));
            Arc::new(RpcContractClient::new(&rpc_url, timeout)?)
        }
    };

    let state = GatewayState::new(routes, reader)?;

    let host = args
        .host
        .clone()
        .or_else(|| config.as_ref().map(|c| c.gateway_host()))
        .unwrap_or_else(|| DEFAULT_GATEWAY_HOST.to_string());
    let port = args
        .port
        .or_else(|| config.as_ref().map(|c| c.gateway_port()))
        .unwrap_or(DEFAULT_GATEWAY_PORT);
    let addr: SocketAddr =
        format!("{}:{}", host, port)
            .parse()
            .map_err(|e| RegistryError::InvalidConfigValueError {
                field: "gateway.host".to_string(),
                value: host.clone(),
                reason: format!("{}", e),
            })?;

    println!("🌐 Read gateway for {} on http://{}", address, addr);
    gateway::serve(Arc::new(state), addr).await
}
