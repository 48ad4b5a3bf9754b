//! Render command - writes the manifests of one hosted control plane

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use tracing::{error, info};

use hcp_render::{
    render_cluster_manifests, ClusterParameters, DirectoryAssets, FileReleaseInfo, RenderFlags,
    RenderRequest,
};

use crate::{Error, Result};

/// Render command arguments
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the cluster parameters file (YAML or JSON)
    #[arg(short = 'f', long = "config", env = "HCP_CONFIG")]
    pub config_file: PathBuf,

    /// Path to the release info document (images and versions of the release)
    #[arg(long, env = "HCP_RELEASE_INFO")]
    pub release_info: PathBuf,

    /// Root of the template asset catalog
    #[arg(long, env = "HCP_ASSETS_DIR", default_value = "assets")]
    pub assets_dir: PathBuf,

    /// Directory replaced by the rendered manifests
    #[arg(short = 'o', long, env = "HCP_OUTPUT_DIR", default_value = "manifests")]
    pub output_dir: PathBuf,

    /// Path to the registry pull secret
    #[arg(long, env = "HCP_PULL_SECRET")]
    pub pull_secret: Option<PathBuf>,

    /// Run etcd in the control plane namespace
    #[arg(long)]
    pub etcd: bool,

    /// Reach guest nodes through OpenVPN
    #[arg(long)]
    pub vpn: bool,

    /// Serve OAuth from the control plane
    #[arg(long)]
    pub external_oauth: bool,

    /// Configure the guest cluster image registry
    #[arg(long)]
    pub include_registry: bool,
}

impl RenderArgs {
    fn flags(&self) -> RenderFlags {
        RenderFlags {
            etcd: self.etcd,
            vpn: self.vpn,
            external_oauth: self.external_oauth,
            include_registry: self.include_registry,
        }
    }

    fn check_paths(&self) -> Result<()> {
        if !self.assets_dir.is_dir() {
            return Err(Error::AssetsNotFound {
                path: self.assets_dir.clone(),
            });
        }
        if same_path(&self.assets_dir, &self.output_dir) {
            return Err(Error::validation(
                "output directory must differ from the assets directory",
            ));
        }
        Ok(())
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Run the render command
pub fn run(args: RenderArgs) -> Result<()> {
    let start = Instant::now();
    let result = render(&args);

    match &result {
        Ok(()) => info!("Render complete in {:?}", start.elapsed()),
        Err(e) if e.is_retryable() => {
            error!(error = %e, retryable = true, "render failed, retry may succeed")
        }
        Err(e) => error!(error = %e, retryable = false, "render failed"),
    }
    result
}

fn render(args: &RenderArgs) -> Result<()> {
    args.check_paths()?;

    let params = ClusterParameters::from_file(&args.config_file)?;
    info!(
        config = %args.config_file.display(),
        namespace = %params.namespace,
        "loaded cluster parameters"
    );

    let release = FileReleaseInfo::new(&args.release_info);
    let pull_secret = args.pull_secret.clone().unwrap_or_default();

    let summary = render_cluster_manifests(RenderRequest {
        params,
        release: &release,
        assets: Arc::new(DirectoryAssets::new(&args.assets_dir)),
        pull_secret_file: &pull_secret,
        output_dir: &args.output_dir,
        flags: args.flags(),
    })?;

    info!(
        direct = summary.direct_manifests,
        user = summary.user_manifests,
        "wrote {} manifests to {}",
        summary.names.len(),
        args.output_dir.display()
    );
    Ok(())
}
