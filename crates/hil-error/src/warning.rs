use hil_core::NodeId;

/// Non-fatal issues accumulated alongside errors but that never stop the
/// driver (`spec.md §7`: "Warnings are accumulated with the same mechanism
/// and never stop the driver").
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WarningError {
    #[error("unlinked module file(s) with no corresponding declaration: {modules:?}")]
    UnlinkedModules { modules: Vec<String> },

    #[error("declaration {0} was reprocessed without producing new facts")]
    RedundantPass(NodeId),
}
