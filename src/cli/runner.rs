//! Wires parsed [`Command`]s to `Image`/`Registry` operations. The one `ExternalError`
//! site in the whole crate lives here: the `docker load` subprocess shell-out (spec
//! §6, §7) is a local daemon collaborator, never part of the core.

use super::args::{Args, Command};
use crate::error::{RegistryError, Result};
use crate::image::Image;
use crate::logging::Logger;
use crate::registry::{Authenticator, BasicAuth, NoAuth, Registry};
use std::path::PathBuf;
use std::sync::Arc;

pub struct Runner {
    args: Args,
    log: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let log = Logger::new(args.verbose);
        Runner { args, log }
    }

    pub async fn run(self) -> Result<()> {
        match self.args.command.clone() {
            Command::Pull {
                hostname,
                image,
                tag,
                lazy,
                username,
                password,
                out,
            } => self.run_pull(hostname, image, tag, lazy, username, password, out).await,
            Command::Push {
                file,
                hostname,
                image,
                tag,
                username,
                password,
            } => self.run_push(file, hostname, image, tag, username, password).await,
            Command::Load { file } => self.run_load(file),
        }
    }

    fn authenticator(username: Option<String>, password: Option<String>) -> Option<Arc<dyn Authenticator>> {
        match (username, password) {
            (Some(u), Some(p)) => Some(Arc::new(BasicAuth::new(u, p))),
            _ => Some(Arc::new(NoAuth)),
        }
    }

    async fn run_pull(
        &self,
        hostname: String,
        image: String,
        tag: String,
        lazy: bool,
        username: Option<String>,
        password: Option<String>,
        out: PathBuf,
    ) -> Result<()> {
        self.log.section("Pull");
        self.log.step(&format!("{}/{}:{}", hostname, image, tag));

        let registry = Registry::new(hostname, Self::authenticator(username, password));
        let pulled = registry.pull_image(&image, &tag, lazy).await?;
        self.log.detail(&format!("{} layers", pulled.layers_top_first().len()));

        pulled.write_filename(&out, "v1").await?;
        self.log.success(&format!("wrote {}", out.display()));
        Ok(())
    }

    async fn run_push(
        &self,
        file: PathBuf,
        hostname: String,
        image: String,
        tag: String,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<()> {
        self.log.section("Push");
        let mut images = Image::from_filename(&file)?;
        let mut loaded = images
            .pop()
            .ok_or_else(|| RegistryError::Format(format!("archive '{}' has no images", file.display())))?;
        loaded.name = image;
        loaded.tag = tag;

        self.log.step(&format!("{}/{}:{}", hostname, loaded.name, loaded.tag));
        let registry = Registry::new(hostname, Self::authenticator(username, password));
        registry.push_image(&loaded).await?;
        self.log.success("push complete");
        Ok(())
    }

    fn run_load(&self, file: PathBuf) -> Result<()> {
        self.log.section("Load");
        self.log.step(&format!("docker load -i {}", file.display()));

        let status = std::process::Command::new("docker")
            .arg("load")
            .arg("-i")
            .arg(&file)
            .status()
            .map_err(|e| RegistryError::External(format!("failed to spawn docker: {}", e)))?;

        if !status.success() {
            return Err(RegistryError::External(format!(
                "docker load exited with status {}",
                status
            )));
        }
        self.log.success("load complete");
        Ok(())
    }
}
