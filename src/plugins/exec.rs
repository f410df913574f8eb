//! External plugins run as a child process
//!
//! A plugin declared with a `config.kubernetes.io/function` annotation runs
//! either a local executable or a container image. The current collection
//! (empty for generators) is written to the child's stdin as a YAML stream;
//! whatever the child prints on stdout is parsed as the new collection.
//!
//! The call blocks until the child exits or the configured timeout elapses.
//! On timeout the child is killed and `Error::PluginTimeout` is returned.

use super::{Generator, Transformer};
use crate::error::{Error, Result};
use crate::loader::FileLoader;
use crate::options::BuildOptions;
use crate::resmap::{parse_resources, ResMap};
use crate::resource::Resource;
use log::{debug, info, warn};
use serde::Deserialize;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Annotation naming the function behind an external plugin
pub const FUNCTION_ANNOTATION: &str = "config.kubernetes.io/function";

/// Environment variable holding the plugin's own configuration document
pub const CONFIG_STRING_ENV: &str = "KUSTOMIZE_PLUGIN_CONFIG_STRING";

/// Environment variable holding the root that declared the plugin
pub const CONFIG_ROOT_ENV: &str = "KUSTOMIZE_PLUGIN_CONFIG_ROOT";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Deserialize)]
struct FunctionSpec {
    #[serde(default)]
    exec: Option<ExecSpec>,
    #[serde(default)]
    container: Option<ContainerSpec>,
}

#[derive(Debug, Deserialize)]
struct ExecSpec {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ContainerSpec {
    image: String,
}

/// How the child process is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runner {
    Exec(PathBuf),
    Container { runtime: String, image: String },
}

/// A generator or transformer implemented by a child process
#[derive(Debug, Clone)]
pub struct ExternalPlugin {
    id: String,
    config: String,
    root: PathBuf,
    runner: Runner,
    timeout: Duration,
}

impl ExternalPlugin {
    /// Build the plugin declared by `res`, if it carries a function
    /// annotation.
    pub fn from_resource(
        res: &Resource,
        loader: &FileLoader,
        options: &BuildOptions,
    ) -> Result<Option<Self>> {
        let Some(function) = res.annotation(FUNCTION_ANNOTATION) else {
            return Ok(None);
        };
        let id = res.cur_id().to_string();
        if !options.enable_external_plugins {
            return Err(Error::PluginExecution {
                plugin: id,
                message: "external plugins are not enabled".to_string(),
                stderr: String::new(),
            });
        }
        let spec: FunctionSpec =
            serde_yaml::from_str(&function).map_err(|e| Error::PluginExecution {
                plugin: id.clone(),
                message: format!("invalid {} annotation: {}", FUNCTION_ANNOTATION, e),
                stderr: String::new(),
            })?;
        let runner = match (spec.exec, spec.container) {
            (Some(exec), _) => Runner::Exec(loader.root().join(exec.path)),
            (None, Some(container)) => Runner::Container {
                runtime: options.container_runtime.clone(),
                image: container.image,
            },
            (None, None) => {
                return Err(Error::PluginExecution {
                    plugin: id,
                    message: "function annotation names neither an exec path nor a container image"
                        .to_string(),
                    stderr: String::new(),
                })
            }
        };
        Ok(Some(Self {
            id,
            config: res.to_yaml()?,
            root: loader.root().to_path_buf(),
            runner,
            timeout: options.plugin_timeout,
        }))
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    fn command(&self) -> Command {
        let mut cmd = match &self.runner {
            Runner::Exec(path) => Command::new(path),
            Runner::Container { runtime, image } => {
                let mut cmd = Command::new(runtime);
                cmd.args(["run", "--rm", "-i", "--network", "none", "-e", CONFIG_STRING_ENV])
                    .arg(image);
                cmd
            }
        };
        cmd.env(CONFIG_STRING_ENV, &self.config)
            .env(CONFIG_ROOT_ENV, &self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.root.is_dir() {
            cmd.current_dir(&self.root);
        }
        cmd
    }

    fn failure(&self, message: String, stderr: &[u8]) -> Error {
        Error::PluginExecution {
            plugin: self.id.clone(),
            message,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Run the child with `input` on stdin and return its stdout.
    fn run(&self, input: &[u8]) -> Result<Vec<u8>> {
        info!("running plugin {} ({:?})", self.id, self.runner);
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| self.failure(format!("failed to start: {}", e), &[]))?;

        let stdin = child.stdin.take();
        let input = input.to_vec();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // A plugin may exit without reading its input.
                let _ = stdin.write_all(&input);
            }
        });
        let stdout = child.stdout.take();
        let out_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_end(&mut buf);
            }
            buf
        });
        let stderr = child.stderr.take();
        let err_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf);
            }
            buf
        });

        let status = match wait_until(&mut child, Instant::now() + self.timeout)? {
            Waited::Exited(status) => status,
            Waited::TimedOut => {
                warn!("plugin {} timed out after {:?}; killed it", self.id, self.timeout);
                return Err(Error::PluginTimeout {
                    plugin: self.id.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let _ = writer.join();
        let out = out_reader.join().unwrap_or_default();
        let err = err_reader.join().unwrap_or_default();
        debug!("plugin {} exited with {}", self.id, status);

        if !status.success() {
            return Err(self.failure(format!("exited with {}", status), &err));
        }
        Ok(out)
    }

    fn parse_output(&self, out: &[u8]) -> Result<Vec<Resource>> {
        parse_resources(out).map_err(|e| self.failure(format!("invalid output: {}", e), &[]))
    }
}

impl Generator for ExternalPlugin {
    fn name(&self) -> String {
        self.id.clone()
    }

    fn generate(&self) -> Result<ResMap> {
        let out = self.run(&[])?;
        let mut map = ResMap::new();
        for res in self.parse_output(&out)? {
            map.append(res)?;
        }
        Ok(map)
    }
}

impl Transformer for ExternalPlugin {
    fn name(&self) -> String {
        self.id.clone()
    }

    fn transform(&self, map: &mut ResMap) -> Result<()> {
        let input = map.as_yaml()?;
        let out = self.run(input.as_bytes())?;
        let resources = self.parse_output(&out)?;
        map.reset(resources)
    }
}

/// The process operations the wait loop needs
trait Supervised {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    fn kill(&mut self) -> io::Result<()>;
    fn reap(&mut self) -> io::Result<()>;
}

impl Supervised for Child {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn reap(&mut self) -> io::Result<()> {
        Child::wait(self).map(|_| ())
    }
}

enum Waited {
    Exited(ExitStatus),
    TimedOut,
}

/// Poll `child` until it exits or `deadline` passes.
///
/// Every path that gives up on the child kills and reaps it first.
fn wait_until(child: &mut impl Supervised, deadline: Instant) -> io::Result<Waited> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Waited::Exited(status)),
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.reap();
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.reap();
            return Ok(Waited::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{FileSystem, MemoryFS};
    use std::sync::Arc;

    fn loader() -> FileLoader {
        let mut fs = MemoryFS::new();
        fs.add_dir("/plugins");
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        FileLoader::new(fs, "/plugins").unwrap()
    }

    fn declared(function: &str) -> Resource {
        let mut res = Resource::new("generators.example/v1", "ManifestGenerator", "gen", None);
        res.set_annotation(FUNCTION_ANNOTATION, function);
        res
    }

    #[test]
    fn test_plain_resource_is_not_external() {
        let res = Resource::new("builtin", "ConfigMapGenerator", "x", None);
        let options = BuildOptions::default().with_external_plugins(true);
        assert!(ExternalPlugin::from_resource(&res, &loader(), &options)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_disabled_by_default() {
        let res = declared("exec:\n  path: ./gen.sh\n");
        let err = ExternalPlugin::from_resource(&res, &loader(), &BuildOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("external plugins are not enabled"));
        assert!(err.to_string().contains("ManifestGenerator.v1.generators.example/gen"));
    }

    #[test]
    fn test_exec_path_is_root_relative() {
        let res = declared("exec:\n  path: ./gen.sh\n");
        let options = BuildOptions::default().with_external_plugins(true);
        let plugin = ExternalPlugin::from_resource(&res, &loader(), &options)
            .unwrap()
            .unwrap();
        assert_eq!(plugin.runner(), &Runner::Exec(PathBuf::from("/plugins/./gen.sh")));
    }

    #[test]
    fn test_container_runner() {
        let res = declared("container:\n  image: example/gen:1.0\n");
        let options = BuildOptions::default().with_external_plugins(true);
        let plugin = ExternalPlugin::from_resource(&res, &loader(), &options)
            .unwrap()
            .unwrap();
        assert_eq!(
            plugin.runner(),
            &Runner::Container {
                runtime: "docker".to_string(),
                image: "example/gen:1.0".to_string()
            }
        );
    }

    #[test]
    fn test_annotation_without_runner() {
        let res = declared("{}");
        let options = BuildOptions::default().with_external_plugins(true);
        assert!(ExternalPlugin::from_resource(&res, &loader(), &options).is_err());
    }

    #[test]
    fn test_missing_executable_fails_to_start() {
        let res = declared("exec:\n  path: /definitely/not/here\n");
        let options = BuildOptions::default().with_external_plugins(true);
        let plugin = ExternalPlugin::from_resource(&res, &loader(), &options)
            .unwrap()
            .unwrap();
        let err = Generator::generate(&plugin).unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[derive(Default)]
    struct LostChild {
        killed: bool,
        reaped: bool,
    }

    impl Supervised for LostChild {
        fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
            Err(io::Error::new(io::ErrorKind::Other, "wait failed"))
        }

        fn kill(&mut self) -> io::Result<()> {
            self.killed = true;
            Ok(())
        }

        fn reap(&mut self) -> io::Result<()> {
            self.reaped = true;
            Ok(())
        }
    }

    #[test]
    fn test_wait_error_kills_and_reaps_child() {
        let mut child = LostChild::default();
        let deadline = Instant::now() + Duration::from_secs(60);
        let err = wait_until(&mut child, deadline).err().expect("wait error");
        assert_eq!(err.to_string(), "wait failed");
        assert!(child.killed);
        assert!(child.reaped);
    }

    #[derive(Default)]
    struct HungChild {
        killed: bool,
        reaped: bool,
    }

    impl Supervised for HungChild {
        fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
            Ok(None)
        }

        fn kill(&mut self) -> io::Result<()> {
            self.killed = true;
            Ok(())
        }

        fn reap(&mut self) -> io::Result<()> {
            self.reaped = true;
            Ok(())
        }
    }

    #[test]
    fn test_deadline_kills_and_reaps_child() {
        let mut child = HungChild::default();
        let outcome = wait_until(&mut child, Instant::now()).unwrap();
        assert!(matches!(outcome, Waited::TimedOut));
        assert!(child.killed && child.reaped);
    }
}
