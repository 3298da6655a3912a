use crate::error::HookError;
use crate::hook::{Entry, Hook};
use crate::identity::Identity;
use crate::logger::{Builder, Client, Logger};
use crate::severity::{to_severity, Level, ALL_LEVELS};
use crate::shipper::Shipper;

/// Monitored resource type of the entries this hook writes.
pub const RESOURCE_TYPE: &str = "container";

/// Forwards every entry to Google Cloud Logging, under a log named after the component and
/// a `container` resource labelled with the cluster and namespace.
#[derive(Debug)]
pub struct CloudLoggingHook {
    identity: Identity,
    logger: Logger,
}

impl CloudLoggingHook {
    /// Creates the hook together with the [`Shipper`] that delivers its entries.
    pub fn new(identity: Identity, client: &Client) -> (Self, Shipper) {
        let (logger, shipper) =
            Self::builder(&identity, client.logger(&identity.component, RESOURCE_TYPE))
                .build_with_shipper(client);
        (Self { identity, logger }, shipper)
    }

    /// Creates the hook on a logger whose entries the caller collects from the builder's
    /// queue.
    pub fn with_logger(identity: Identity, logger: Logger) -> Self {
        Self { identity, logger }
    }

    /// Applies the resource descriptor every entry of `identity` is tagged with.
    pub fn builder(identity: &Identity, builder: Builder) -> Builder {
        builder.with_resource_labels([
            ("cluster_name", identity.cluster.as_str()),
            ("namespace_id", identity.namespace.as_str()),
        ])
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Hook for CloudLoggingHook {
    fn levels(&self) -> &[Level] {
        &ALL_LEVELS
    }

    // TODO: decide whether write failures should surface here once delivery guarantees
    // are settled; for now the shipper reports them on stderr.
    fn fire(&self, entry: &Entry<'_>) -> Result<(), HookError> {
        self.logger
            .log(to_severity(entry.level), entry.message, entry.fields.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn identity() -> Identity {
        Identity {
            project_id: "my-project".to_string(),
            cluster: "mycluster".to_string(),
            namespace: "payments".to_string(),
            component: "myservice".to_string(),
        }
    }

    fn hook() -> (
        CloudLoggingHook,
        tokio::sync::mpsc::Receiver<google_logging2::api::WriteLogEntriesRequest>,
    ) {
        let client = Client::new("my-project", "169.254.169.254").unwrap();
        let (logger, rx) =
            CloudLoggingHook::builder(&identity(), client.logger("myservice", RESOURCE_TYPE))
                .build();
        (CloudLoggingHook::with_logger(identity(), logger), rx)
    }

    #[test]
    fn subscribes_to_all_levels() {
        let (hook, _rx) = hook();
        assert_eq!(hook.levels(), &ALL_LEVELS[..]);
    }

    #[test]
    fn fire_writes_one_tagged_entry() {
        let (hook, mut rx) = hook();

        hook.fire(&Entry {
            level: Level::Fatal,
            message: "out of cheese",
            fields: HashMap::new(),
        })
        .unwrap();

        let request = rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(
            request.log_name.as_deref(),
            Some("projects/my-project/logs/myservice")
        );
        let entries = request.entries.unwrap();
        let entry = &entries[0];
        assert_eq!(entry.text_payload.as_deref(), Some("out of cheese"));
        assert_eq!(entry.severity.as_deref(), Some("CRITICAL"));
        let resource = entry.resource.as_ref().unwrap();
        assert_eq!(resource.type_.as_deref(), Some("container"));
        assert_eq!(
            resource.labels,
            Some(HashMap::from([
                ("cluster_name".to_string(), "mycluster".to_string()),
                ("namespace_id".to_string(), "payments".to_string()),
            ]))
        );
    }

    #[test]
    fn severities_follow_the_level() {
        let (hook, mut rx) = hook();
        for level in ALL_LEVELS {
            hook.fire(&Entry {
                level,
                message: "m",
                fields: HashMap::new(),
            })
            .unwrap();
        }
        let mut severities = vec![];
        while let Ok(request) = rx.try_recv() {
            severities.push(request.entries.unwrap()[0].severity.clone().unwrap());
        }
        assert_eq!(
            severities,
            vec!["CRITICAL", "CRITICAL", "ERROR", "WARNING", "INFO", "DEBUG", "DEFAULT"]
        );
    }

    #[test]
    fn fire_succeeds_without_a_shipper() {
        let (hook, rx) = hook();
        drop(rx);
        assert!(hook
            .fire(&Entry {
                level: Level::Info,
                message: "lost",
                fields: HashMap::new(),
            })
            .is_ok());
    }
}
