use crate::utils;
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use image_shift_aws::AwsContext;
use image_shift_config::Defaults;
use image_shift_core::{ShiftRequest, shift};

#[derive(Args, Debug, Default)]
pub struct ShiftArgs {
    /// region of your ECS cluster
    #[arg(short, long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// name of your ECS cluster
    #[arg(short = 'n', long = "cluster-name", env = "IMAGE_SHIFT_CLUSTER")]
    pub cluster: Option<String>,

    /// select service in ECS cluster
    #[arg(short, long)]
    pub service: Option<String>,

    /// Name and version of the container (container=image:tag or container=:tag)
    #[arg(short, long = "container", value_delimiter = ',')]
    pub containers: Vec<String>,

    /// Secrets Manager secret whose JSON keys are attached to every container
    #[arg(long = "secret", value_delimiter = ',')]
    pub secrets: Vec<String>,

    /// update & deploy service to new task definition
    #[arg(short, long)]
    pub deploy: bool,
}

/// Fully resolved run settings
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    pub region: String,
    pub request: ShiftRequest,
}

impl ShiftArgs {
    /// Merge flags with the defaults file and check required values
    pub fn resolve(self, defaults: &Defaults) -> anyhow::Result<Settings> {
        let region = non_empty(self.region)
            .or_else(|| defaults.region.clone())
            .ok_or_else(|| anyhow::anyhow!("the --region flag is required"))?;
        let cluster = non_empty(self.cluster)
            .or_else(|| defaults.cluster.clone())
            .ok_or_else(|| anyhow::anyhow!("the --cluster-name flag is required"))?;
        let service =
            non_empty(self.service).ok_or_else(|| anyhow::anyhow!("the --service flag is required"))?;

        Ok(Settings {
            region,
            request: ShiftRequest {
                cluster,
                service,
                overrides: self.containers,
                secrets: self.secrets,
                deploy: self.deploy,
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn handle(settings: Settings) -> anyhow::Result<()> {
    let Settings { region, request } = settings;

    println!(
        "{} {} / {} ({})",
        "Shifting images of".blue().bold(),
        request.cluster.cyan(),
        request.service.cyan(),
        region
    );

    let aws = AwsContext::load(&region).await;
    let orchestrator = aws.ecs();
    let store = aws.secrets_manager();

    match shift(&orchestrator, &store, &request).await {
        Ok(outcome) => {
            utils::print_outcome(&outcome, &request.service);
            Ok(())
        }
        Err(e) => {
            if let Some(arn) = e.registered_arn() {
                eprintln!(
                    "{} {}",
                    "new task revision was registered but not deployed:".yellow(),
                    arn.cyan()
                );
            }
            let phase = e.phase();
            Err(e).with_context(|| format!("image-shift aborted in {phase} phase"))
        }
    }
}
