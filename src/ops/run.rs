//! Running a container with a compatible host MPI.
//!
//! The pipeline:
//!
//! 1. locate the image and read its metadata
//! 2. resolve a compatible host MPI, installing the container's version on a miss
//! 3. activate that MPI in the invoking shell
//! 4. build the launcher command line and pick a job manager
//! 5. submit, execute and collect the job output
//!
//! Any error stops the pipeline. An activation that already happened is kept.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::Builder;
use crate::core::container::image_path;
use crate::core::{
    discover, ContainerInfo, ExecutionModel, Job, JobState, LaunchResult, Namespace, RuntimeInstall,
};
use crate::env::EnvironmentActivator;
use crate::error::{Error, Result};
use crate::inspect::Inspector;
use crate::jobmgr::{self, JobManager, SystemConfig};
use crate::ops::install::install_runtime;
use crate::resolver::{self, CompatibilityResult, VersionOrder};
use crate::util::shell::{Shell, Status};

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Node count (0 = scheduler decides)
    pub num_nodes: u32,
    /// Rank count (0 = launcher decides)
    pub num_procs: u32,
    /// Keep batch scripts and job output
    pub keep_artifacts: bool,
    /// Container runtime executable
    pub singularity: PathBuf,
    /// Where job files are written
    pub scratch_dir: PathBuf,
    pub version_order: VersionOrder,
}

/// Arguments passed to `mpirun` to start `container` on the host install.
///
/// `[-np N] <singularity> exec [--bind <host install>:<mpi dir>] <image> <app>`
pub fn launcher_args(
    num_procs: u32,
    singularity: &Path,
    container: &ContainerInfo,
    host: &RuntimeInstall,
) -> Vec<String> {
    let mut args = Vec::new();
    if num_procs > 0 {
        args.push("-np".to_string());
        args.push(num_procs.to_string());
    }
    args.push(singularity.display().to_string());
    args.push("exec".to_string());
    if container.model == ExecutionModel::Bind {
        if let Some(mpi_dir) = &container.mpi_dir {
            args.push("--bind".to_string());
            args.push(format!("{}:{}", host.install_dir.display(), mpi_dir));
        }
    }
    args.push(container.image.display().to_string());
    args.push(container.app_exe.clone());
    args
}

/// The "run container" workflow.
pub struct Launch<'a> {
    sympi_dir: PathBuf,
    inspector: &'a dyn Inspector,
    builder: &'a dyn Builder,
    activator: &'a mut EnvironmentActivator,
    managers: Vec<Box<dyn JobManager>>,
    sys: SystemConfig,
    options: LaunchOptions,
    shell: Arc<Shell>,
}

impl<'a> Launch<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sympi_dir: impl Into<PathBuf>,
        inspector: &'a dyn Inspector,
        builder: &'a dyn Builder,
        activator: &'a mut EnvironmentActivator,
        managers: Vec<Box<dyn JobManager>>,
        sys: SystemConfig,
        options: LaunchOptions,
        shell: Arc<Shell>,
    ) -> Self {
        Launch {
            sympi_dir: sympi_dir.into(),
            inspector,
            builder,
            activator,
            managers,
            sys,
            options,
            shell,
        }
    }

    pub fn run(&mut self, container: &str) -> Result<LaunchResult> {
        let image = image_path(&self.sympi_dir, container);
        if !image.is_file() {
            return Err(Error::not_found("container image", image.display().to_string()));
        }

        self.shell
            .status(Status::Resolving, format!("configuration of {}", image.display()));
        let info = self.inspector.inspect(container, &image)?;
        tracing::info!("container based on {}", info.mpi);

        let host = self.find_host_mpi(&info)?;
        tracing::info!("container is in {} mode", info.model);

        self.activator.load(Namespace::Mpi, &host)?;
        self.shell.status(Status::Loaded, host.implementation());

        let args = launcher_args(self.options.num_procs, &self.options.singularity, &info, &host);
        let manager = jobmgr::select(&self.managers, &mut self.sys)?;

        fs::create_dir_all(&self.options.scratch_dir)
            .map_err(|e| Error::io(&self.options.scratch_dir, e))?;
        // One directory per run; job files of earlier runs are never reused.
        let scratch = tempfile::Builder::new()
            .prefix(&format!("{}_", container))
            .tempdir_in(&self.options.scratch_dir)
            .map_err(|e| Error::io(&self.options.scratch_dir, e))?;
        let mut job = Job::new(container, host, scratch.path())
            .with_nodes(self.options.num_nodes)
            .with_procs(self.options.num_procs)
            .with_app(info.app_exe.clone())
            .with_container(info)
            .with_args(args);

        let result = self.dispatch(manager, &mut job);

        if self.options.keep_artifacts {
            let kept = scratch.keep();
            self.shell
                .note(format!("job files of {} kept in {}", container, kept.display()));
        } else if result.is_ok() {
            if let Err(e) = manager.cleanup(&job) {
                tracing::warn!("failed to clean up job {}: {}", job.name, e);
            }
        }

        result
    }

    /// Submit `job`, run it and collect its output.
    fn dispatch(&self, manager: &dyn JobManager, job: &mut Job) -> Result<LaunchResult> {
        let descriptor = manager.submit(job, &self.sys)?;
        self.shell
            .status(Status::Running, format!("{} through {}", job.name, manager.id()));

        let output = match descriptor.exec() {
            Ok(output) => output,
            Err(e) if manager.id().is_batch() => {
                job.advance(JobState::Failed)?;
                return Err(Error::Scheduler(format!(
                    "failed to submit job {}: {:#}",
                    job.name, e
                )));
            }
            Err(e) => {
                job.advance(JobState::Failed)?;
                return Ok(LaunchResult {
                    passed: false,
                    err: Some(format!("{:#}", e)),
                    ..LaunchResult::default()
                });
            }
        };
        job.record(&output)?;

        if manager.id().is_batch() && !output.status.success() {
            return Err(Error::Scheduler(format!(
                "`{}` failed with exit code {:?}: {}",
                descriptor.display_command(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let passed = output.status.success();
        Ok(LaunchResult {
            passed,
            stdout: manager.get_output(job),
            stderr: manager.get_error(job),
            err: (!passed).then(|| {
                format!(
                    "`{}` exited with code {:?}",
                    descriptor.display_command(),
                    output.status.code()
                )
            }),
        })
    }

    /// Resolve a host MPI for `info`, installing the container's version if
    /// nothing compatible is present.
    fn find_host_mpi(&self, info: &ContainerInfo) -> Result<RuntimeInstall> {
        let order = self.options.version_order;
        let installs = discover(&self.sympi_dir, Namespace::Mpi)?;

        if let CompatibilityResult::Resolved { install, exact } =
            resolver::resolve(&info.mpi, &installs, order)
        {
            tracing::info!(
                "{} found on the host as a{} compatible version",
                install.implementation(),
                if exact { "n exact" } else { "" }
            );
            return Ok(install);
        }

        self.shell.status(
            Status::Installing,
            format!("{}, no compatible MPI on the host", info.mpi),
        );
        install_runtime(&self.sympi_dir, &info.mpi, self.builder, &self.shell).map_err(|e| {
            Error::Compatibility {
                id: info.mpi.id.clone(),
                version: info.mpi.version.clone(),
                reason: format!("on-demand install failed: {:#}", e),
            }
        })?;

        let installs = discover(&self.sympi_dir, Namespace::Mpi)?;
        match resolver::resolve(&info.mpi, &installs, order) {
            CompatibilityResult::Resolved { install, exact: true } => Ok(install),
            _ => Err(Error::Compatibility {
                id: info.mpi.id.clone(),
                version: info.mpi.version.clone(),
                reason: "install did not produce the requested version".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Implementation;
    use crate::env::{ActiveEnvironment, FixedSession, SessionId};
    use crate::jobmgr::{JobManagerId, Local};
    use crate::test_support::fixtures::{fake_container, fake_install, link_echo_launcher};
    use crate::ops::install::InstallLock;
    use crate::test_support::{fake_slurm, FakeBuilder, FakeInspector, FakeJobManager};
    use tempfile::TempDir;

    struct Harness {
        tmp: TempDir,
        activator: EnvironmentActivator,
    }

    impl Harness {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            fs::write(tmp.path().join("sympi_4242"), "").unwrap();
            let activator = EnvironmentActivator::new(
                Box::new(FixedSession(SessionId(4242))),
                tmp.path(),
                ActiveEnvironment::from_vars("/usr/bin", ""),
            );
            Harness { tmp, activator }
        }

        fn base(&self) -> &Path {
            self.tmp.path()
        }

        fn options(&self) -> LaunchOptions {
            LaunchOptions {
                num_nodes: 0,
                num_procs: 2,
                keep_artifacts: false,
                singularity: PathBuf::from("/usr/bin/singularity"),
                scratch_dir: self.tmp.path().join("scratch"),
                version_order: VersionOrder::Lexical,
            }
        }

        fn handoff(&self) -> String {
            fs::read_to_string(self.tmp.path().join("sympi_4242")).unwrap()
        }
    }

    fn bind_info(base: &Path, mpi: &str) -> ContainerInfo {
        ContainerInfo {
            name: "hello".to_string(),
            image: image_path(base, "hello"),
            model: ExecutionModel::Bind,
            mpi: mpi.parse().unwrap(),
            app_exe: "/opt/app/hello".to_string(),
            mpi_dir: Some("/opt/ompi".to_string()),
        }
    }

    #[test]
    fn test_launcher_args_bind() {
        let base = Path::new("/s");
        let host = RuntimeInstall::new(base, &Implementation::new("openmpi", "4.0.2"));
        let args = launcher_args(4, Path::new("singularity"), &bind_info(base, "openmpi:4.0.2"), &host);
        assert_eq!(
            args,
            vec![
                "-np",
                "4",
                "singularity",
                "exec",
                "--bind",
                "/s/mpi_install_openmpi-4.0.2:/opt/ompi",
                "/s/mpi_container_hello/hello.sif",
                "/opt/app/hello",
            ]
        );
    }

    #[test]
    fn test_launcher_args_integrated() {
        let base = Path::new("/s");
        let host = RuntimeInstall::new(base, &Implementation::new("mpich", "3.3"));
        let mut info = bind_info(base, "mpich:3.3");
        info.model = ExecutionModel::Integrated;
        info.mpi_dir = None;

        let args = launcher_args(0, Path::new("singularity"), &info, &host);
        assert_eq!(
            args,
            vec!["singularity", "exec", "/s/mpi_container_hello/hello.sif", "/opt/app/hello"]
        );
    }

    #[test]
    fn test_missing_image() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        let options = h.options();
        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);

        let mut launch = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            vec![Box::new(Local::new())],
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        );
        assert!(matches!(launch.run("hello"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_local_run_with_compatible_install() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        let host = fake_install(&base, "openmpi:4.0.5");
        link_echo_launcher(&host);
        let options = h.options();

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);

        let result = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            vec![Box::new(Local::new())],
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap();

        assert!(result.passed, "{:?}", result);
        assert_eq!(
            result.stdout.trim(),
            format!(
                "-np 2 /usr/bin/singularity exec --bind {}:/opt/ompi {} /opt/app/hello",
                host.install_dir.display(),
                image_path(&base, "hello").display()
            )
        );
        assert!(builder.installed().is_empty());
        assert!(h.handoff().contains(&format!("export PATH={}:/usr/bin", host.bin_dir.display())));
    }

    #[test]
    fn test_on_demand_install() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        // Older major: not compatible with a 4.x container.
        fake_install(&base, "openmpi:3.1.5");
        let options = h.options();

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);
        let managers: Vec<Box<dyn JobManager>> =
            vec![Box::new(FakeJobManager::new(JobManagerId::Local, true))];

        let result = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            managers,
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap();

        assert!(result.passed);
        assert_eq!(builder.installed(), vec![Implementation::new("openmpi", "4.0.2")]);
        assert!(h.handoff().contains("mpi_install_openmpi-4.0.2/bin"));
    }

    #[test]
    fn test_failed_on_demand_install_is_compatibility_error() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        let options = h.options();

        let inspector = FakeInspector::new(bind_info(&base, "mpich:3.3"));
        let builder = FakeBuilder::failing(&base);

        let err = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            vec![Box::new(Local::new())],
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap_err();

        assert!(matches!(err, Error::Compatibility { .. }));
        assert_eq!(h.handoff(), "");
    }

    #[test]
    fn test_local_failure_is_not_passed() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        fake_install(&base, "openmpi:4.0.2");
        let options = h.options();

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);
        let managers: Vec<Box<dyn JobManager>> = vec![Box::new(
            FakeJobManager::new(JobManagerId::Local, true).with_script("echo boom >&2; exit 3"),
        )];

        let result = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            managers,
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap();

        assert!(!result.passed);
        assert_eq!(result.stderr, "boom\n");
        assert!(result.err.is_some());
    }

    #[test]
    fn test_batch_failure_is_scheduler_error() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        fake_install(&base, "openmpi:4.0.2");
        let options = h.options();

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);
        let managers: Vec<Box<dyn JobManager>> = vec![Box::new(
            FakeJobManager::new(JobManagerId::Slurm, true).with_script("exit 1"),
        )];

        let err = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            managers,
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap_err();

        assert!(matches!(err, Error::Scheduler(_)));
        // Activation happened before the failure and is kept.
        assert!(h.handoff().contains("mpi_install_openmpi-4.0.2"));
    }

    #[test]
    fn test_batch_run_reads_job_files() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        let host = fake_install(&base, "openmpi:4.0.2");
        link_echo_launcher(&host);
        let options = h.options();
        let scratch = options.scratch_dir.clone();

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);

        let result = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            vec![Box::new(fake_slurm()), Box::new(Local::new())],
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap();

        assert!(result.passed, "{:?}", result);
        assert_eq!(
            result.stdout,
            format!(
                "-np 2 /usr/bin/singularity exec --bind {}:/opt/ompi {} /opt/app/hello\n",
                host.install_dir.display(),
                image_path(&base, "hello").display()
            )
        );
        assert_eq!(result.stderr, "");
        // Script, output and the run directory itself are gone.
        assert_eq!(fs::read_dir(&scratch).unwrap().count(), 0);
    }

    #[test]
    fn test_kept_runs_do_not_share_job_files() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        link_echo_launcher(&fake_install(&base, "openmpi:4.0.2"));
        let scratch = h.options().scratch_dir;

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);

        for procs in [4, 8] {
            let options = LaunchOptions {
                num_procs: procs,
                keep_artifacts: true,
                ..h.options()
            };
            let result = Launch::new(
                &base,
                &inspector,
                &builder,
                &mut h.activator,
                vec![Box::new(fake_slurm())],
                SystemConfig::default(),
                options,
                Arc::new(Shell::from_flags(true, false, true)),
            )
            .run("hello")
            .unwrap();
            assert!(result.stdout.starts_with(&format!("-np {} ", procs)));
        }

        let mut scripts: Vec<String> = fs::read_dir(&scratch)
            .unwrap()
            .map(|e| fs::read_to_string(e.unwrap().path().join("hello.sh")).unwrap())
            .collect();
        scripts.sort_by_key(|s| s.contains("--ntasks=8"));
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains("#SBATCH --ntasks=4\n"));
        assert!(scripts[1].contains("#SBATCH --ntasks=8\n"));
        assert!(scripts[1].contains("mpirun -np 8 "));
    }

    #[test]
    fn test_install_in_progress_is_not_used() {
        let mut h = Harness::new();
        let base = h.base().to_path_buf();
        fake_container(&base, "hello");
        let imp = Implementation::new("openmpi", "4.0.2");
        let _lock = InstallLock::acquire(&base, &imp).unwrap();
        fake_install(&base, "openmpi:4.0.2");
        let options = h.options();

        let inspector = FakeInspector::new(bind_info(&base, "openmpi:4.0.2"));
        let builder = FakeBuilder::new(&base);

        let err = Launch::new(
            &base,
            &inspector,
            &builder,
            &mut h.activator,
            vec![Box::new(Local::new())],
            SystemConfig::default(),
            options,
            Arc::new(Shell::from_flags(true, false, true)),
        )
        .run("hello")
        .unwrap_err();

        assert!(matches!(err, Error::Compatibility { .. }));
        assert!(builder.installed().is_empty());
        assert_eq!(h.handoff(), "");
    }
}
