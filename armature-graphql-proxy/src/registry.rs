//! Operation document registry.
//!
//! Documents are discovered and validated elsewhere; the proxy only needs to
//! look up the kind and document text of a named operation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::OperationKind;

/// A registered operation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredOperation {
    /// Operation kind.
    pub kind: OperationKind,
    /// Serialized document text sent to the GraphQL server.
    pub document: Arc<str>,
}

/// Source of operation documents by name.
pub trait DocumentRegistry: Send + Sync {
    /// Look up an operation by name.
    fn lookup(&self, name: &str) -> Option<RegisteredOperation>;
}

/// In-memory registry filled at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentRegistry {
    operations: HashMap<String, RegisteredOperation>,
}

impl StaticDocumentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation, replacing any previous one with the same name.
    pub fn register(
        &mut self,
        kind: OperationKind,
        name: impl Into<String>,
        document: impl Into<Arc<str>>,
    ) -> &mut Self {
        self.operations.insert(
            name.into(),
            RegisteredOperation {
                kind,
                document: document.into(),
            },
        );
        self
    }

    /// Builder-style query registration.
    pub fn with_query(mut self, name: impl Into<String>, document: impl Into<Arc<str>>) -> Self {
        self.register(OperationKind::Query, name, document);
        self
    }

    /// Builder-style mutation registration.
    pub fn with_mutation(mut self, name: impl Into<String>, document: impl Into<Arc<str>>) -> Self {
        self.register(OperationKind::Mutation, name, document);
        self
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl DocumentRegistry for StaticDocumentRegistry {
    fn lookup(&self, name: &str) -> Option<RegisteredOperation> {
        self.operations.get(name).cloned()
    }
}

impl<R: DocumentRegistry + ?Sized> DocumentRegistry for Arc<R> {
    fn lookup(&self, name: &str) -> Option<RegisteredOperation> {
        (**self).lookup(name)
    }
}
