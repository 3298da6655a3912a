use crate::error::Error;
use crate::forward::CloudLoggingHook;
use crate::hook::{Hooks, Output};
use crate::identity::{to_cluster_id, to_component_name, Identity};
use crate::logger::Client;
use crate::metadata::{Metadata, MetadataClient};
use crate::shipper::Shipper;

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Set through the downward API to the namespace the pod runs in.
pub const NAMESPACE_VAR: &str = "POD_NAMESPACE";

/// Set through the downward API to the name of the pod.
pub const POD_NAME_VAR: &str = "POD_NAME";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// What a successful bootstrap on GKE leaves behind.
pub struct Activation {
    identity: Identity,
    shipper: Mutex<Option<Shipper>>,
}

impl Activation {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Hands out the [`Shipper`] feeding the Logging API. Only the first call gets it; the
    /// caller is expected to spawn [`Shipper::run_log_shipper`].
    pub fn take_shipper(&self) -> Option<Shipper> {
        self.shipper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Discovers the environment and, on GKE, hooks Google Cloud Logging into a set of
/// [`Hooks`].
///
/// The discovery runs at most once per `Bootstrap`, however often and from however many
/// tasks [`run`](Bootstrap::run) is called. Every caller sees the outcome of that one run.
pub struct Bootstrap<M> {
    metadata: M,
    env: EnvLookup,
    outcome: OnceCell<Result<Option<Activation>, Error>>,
}

impl<M: Metadata> Bootstrap<M> {
    pub fn new(metadata: M) -> Self {
        Self {
            metadata,
            env: Box::new(|name| std::env::var(name).ok()),
            outcome: OnceCell::new(),
        }
    }

    /// Replaces the process environment as the source of the pod variables.
    #[must_use]
    pub fn with_env<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            env: Box::new(lookup),
            ..self
        }
    }

    /// Returns `Ok(None)` when not running on GCE, in which case `hooks` is left alone.
    /// Otherwise registers a [`CloudLoggingHook`] and switches the output of `hooks` to
    /// [`Output::Discard`].
    ///
    /// Any error is a misconfiguration of the deployment and should end the process.
    pub async fn run(&self, hooks: &Hooks) -> Result<Option<&Activation>, &Error> {
        self.outcome
            .get_or_init(|| self.activate(hooks))
            .await
            .as_ref()
            .map(Option::as_ref)
    }

    async fn activate(&self, hooks: &Hooks) -> Result<Option<Activation>, Error> {
        if !self.metadata.on_gce().await {
            return Ok(None);
        }

        let identity = self.resolve().await?;
        let client = Client::new(&identity.project_id, self.metadata.host())?;
        let (hook, shipper) = CloudLoggingHook::new(identity.clone(), &client);

        hooks.add(Arc::new(hook));
        hooks.set_output(Output::Discard);

        Ok(Some(Activation {
            identity,
            shipper: Mutex::new(Some(shipper)),
        }))
    }

    async fn resolve(&self) -> Result<Identity, Error> {
        let project_id = self.metadata.project_id().await?;
        let instance = self.metadata.instance_name().await?;
        let namespace = self.required_env(NAMESPACE_VAR)?;
        let pod = self.required_env(POD_NAME_VAR)?;

        Ok(Identity {
            project_id,
            cluster: to_cluster_id(&instance)?,
            namespace,
            component: to_component_name(&pod)?,
        })
    }

    fn required_env(&self, name: &str) -> Result<String, Error> {
        (self.env)(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::MissingEnvVar(name.to_string()))
    }
}

lazy_static::lazy_static! {
    static ref PROCESS: Bootstrap<MetadataClient> = Bootstrap::new(MetadataClient::from_env());
}

/// The process-wide bootstrap, using the real metadata server and environment.
///
/// Only the first call registers anything; later calls return the same outcome and ignore
/// their `hooks`.
pub async fn init(hooks: &Hooks) -> Result<Option<&'static Activation>, &'static Error> {
    PROCESS.run(hooks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Level;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeMetadata {
        on_gce: bool,
        instance: &'static str,
        lookups: Arc<AtomicUsize>,
    }

    impl FakeMetadata {
        fn gke() -> Self {
            Self {
                on_gce: true,
                instance: "gke-mycluster-abc-pool-xyz",
                lookups: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Metadata for FakeMetadata {
        async fn on_gce(&self) -> bool {
            self.on_gce
        }

        async fn project_id(&self) -> Result<String, Error> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok("my-project".to_string())
        }

        async fn instance_name(&self) -> Result<String, Error> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.instance.to_string())
        }

        fn host(&self) -> &str {
            "127.0.0.1:9"
        }
    }

    fn pod_env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn bootstrap(metadata: FakeMetadata) -> Bootstrap<FakeMetadata> {
        Bootstrap::new(metadata).with_env(pod_env(&[
            (NAMESPACE_VAR, "payments"),
            (POD_NAME_VAR, "myservice-7d9f-abcde"),
        ]))
    }

    #[tokio::test]
    async fn resolves_identity_and_registers_hook() {
        let hooks = Hooks::new();
        let bootstrap = bootstrap(FakeMetadata::gke());

        let activation = bootstrap.run(&hooks).await.unwrap().unwrap();

        assert_eq!(
            *activation.identity(),
            Identity {
                project_id: "my-project".to_string(),
                cluster: "mycluster".to_string(),
                namespace: "payments".to_string(),
                component: "myservice".to_string(),
            }
        );
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks.output(), Output::Discard);
        assert!(activation.take_shipper().is_some());
        assert!(activation.take_shipper().is_none());
    }

    #[tokio::test]
    async fn off_platform_does_nothing() {
        let hooks = Hooks::new();
        let metadata = FakeMetadata {
            on_gce: false,
            ..FakeMetadata::gke()
        };
        let lookups = metadata.lookups.clone();

        assert!(bootstrap(metadata).run(&hooks).await.unwrap().is_none());

        assert_eq!(lookups.load(Ordering::SeqCst), 0);
        assert!(hooks.is_empty());
        assert_eq!(hooks.output(), Output::Default);
    }

    #[tokio::test]
    async fn missing_namespace_aborts_before_registration() {
        let hooks = Hooks::new();
        let bootstrap = Bootstrap::new(FakeMetadata::gke())
            .with_env(pod_env(&[(POD_NAME_VAR, "myservice-7d9f-abcde")]));

        let err = bootstrap.run(&hooks).await.err().unwrap();

        assert!(matches!(err, Error::MissingEnvVar(name) if name == NAMESPACE_VAR));
        assert!(err.to_string().contains("downward API"));
        assert!(hooks.is_empty());
        assert_eq!(hooks.output(), Output::Default);
    }

    #[tokio::test]
    async fn empty_pod_name_aborts_before_registration() {
        let hooks = Hooks::new();
        let bootstrap = Bootstrap::new(FakeMetadata::gke())
            .with_env(pod_env(&[(NAMESPACE_VAR, "payments"), (POD_NAME_VAR, "")]));

        let err = bootstrap.run(&hooks).await.err().unwrap();

        assert!(matches!(err, Error::MissingEnvVar(name) if name == POD_NAME_VAR));
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn non_gke_instance_aborts() {
        let hooks = Hooks::new();
        let bootstrap = bootstrap(FakeMetadata {
            instance: "my-plain-vm",
            ..FakeMetadata::gke()
        });

        let err = bootstrap.run(&hooks).await.err().unwrap();

        assert!(matches!(err, Error::ClusterIdError(_)));
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn repeated_runs_resolve_once() {
        let hooks = Hooks::new();
        let metadata = FakeMetadata::gke();
        let lookups = metadata.lookups.clone();
        let bootstrap = bootstrap(metadata);

        let (a, b, c) = tokio::join!(
            bootstrap.run(&hooks),
            bootstrap.run(&hooks),
            bootstrap.run(&hooks)
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert!(bootstrap.run(&hooks).await.is_ok());

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_runs_resolve_once() {
        let hooks = Arc::new(Hooks::new());
        let metadata = FakeMetadata::gke();
        let lookups = metadata.lookups.clone();
        let bootstrap = Arc::new(bootstrap(metadata));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let hooks = hooks.clone();
                let bootstrap = bootstrap.clone();
                tokio::spawn(async move { bootstrap.run(&hooks).await.is_ok() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.len(), 1);
    }

    #[tokio::test]
    async fn failure_is_remembered() {
        let hooks = Hooks::new();
        let metadata = FakeMetadata::gke();
        let lookups = metadata.lookups.clone();
        let bootstrap = Bootstrap::new(metadata).with_env(pod_env(&[]));

        assert!(bootstrap.run(&hooks).await.is_err());
        assert!(bootstrap.run(&hooks).await.is_err());

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn registered_hook_forwards_panics() {
        let hooks = Hooks::new();
        let bootstrap = bootstrap(FakeMetadata::gke());
        bootstrap.run(&hooks).await.unwrap();

        // Queued for the (unspawned) shipper; firing must not block or fail.
        hooks.fire_panic("boom");
        hooks.fire(&crate::hook::Entry {
            level: Level::Debug,
            message: "debugging",
            fields: HashMap::new(),
        });
    }
}
