use std::sync::{Arc, Mutex};

use epicenter_core::action::ActionSet;
use epicenter_core::config::EpicenterConfig;
use epicenter_core::epicenter::Epicenter;
use epicenter_core::materializer::{Materializer, MaterializerContext, MaterializerError};
use epicenter_core::schema::WorkspaceSchema;
use epicenter_core::workspace::Workspace;

use async_trait::async_trait;

/// A no-op materializer that records when its initial `pull` ran, so tests can assert
/// on Epicenter-wide startup ordering (§8 property 7) without depending on a real
/// backend.
struct LoggingMaterializer {
    label: String,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Materializer for LoggingMaterializer {
    fn name(&self) -> &str {
        "logging"
    }

    fn tables(&self) -> Vec<String> {
        Vec::new()
    }

    async fn on_add(&self, _table: &str, _id: &str, _row: &std::collections::HashMap<String, epicenter_core::field::Value>) -> Result<(), MaterializerError> {
        Ok(())
    }

    async fn on_update(&self, _table: &str, _id: &str, _row: &std::collections::HashMap<String, epicenter_core::field::Value>) -> Result<(), MaterializerError> {
        Ok(())
    }

    async fn on_delete(&self, _table: &str, _id: &str) -> Result<(), MaterializerError> {
        Ok(())
    }

    async fn pull(&self) -> Result<(), MaterializerError> {
        self.log.lock().unwrap().push(format!("pulled:{}", self.label));
        Ok(())
    }
}

fn logging_materializer(
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
) -> impl FnOnce(MaterializerContext) -> Arc<dyn Materializer> {
    move |_ctx: MaterializerContext| -> Arc<dyn Materializer> {
        Arc::new(LoggingMaterializer {
            label: label.to_string(),
            log,
        })
    }
}

fn empty_schema() -> WorkspaceSchema {
    WorkspaceSchema::builder().build()
}

/// §8 property 7: a dependency's initial materializer pull (and the rest of its
/// startup) completes before any dependent workspace begins its own startup.
#[tokio::test]
async fn dependency_workspace_fully_starts_before_dependent() {
    let root = tempfile::tempdir().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let upstream = Workspace::builder("upstream", root.path(), empty_schema())
        .materializer(logging_materializer("upstream", Arc::clone(&log)))
        .build();
    let downstream = Workspace::builder("downstream", root.path(), empty_schema())
        .materializer(logging_materializer("downstream", Arc::clone(&log)))
        .build();

    let epicenter = Epicenter::builder(EpicenterConfig::new(root.path()))
        .workspace("upstream", upstream, Vec::<String>::new(), ActionSet::new())
        .workspace("downstream", downstream, vec!["upstream"], ActionSet::new())
        .build()
        .unwrap();

    assert_eq!(epicenter.workspace_ids(), &["upstream".to_string(), "downstream".to_string()]);

    epicenter.start().await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["pulled:upstream".to_string(), "pulled:downstream".to_string()]
    );

    epicenter.shutdown().await;
}

#[tokio::test]
async fn unknown_dependency_is_rejected_at_build_time() {
    let root = tempfile::tempdir().unwrap();
    let workspace = Workspace::builder("a", root.path(), empty_schema()).build();

    let err = Epicenter::builder(EpicenterConfig::new(root.path()))
        .workspace("a", workspace, vec!["ghost"], ActionSet::new())
        .build()
        .unwrap_err();

    assert_eq!(err.code(), "unknown-dependency");
}
