// Side-channel diagnostics over assembly runs. Nothing here alters the assembled document.

pub mod loss_report;

pub use loss_report::{
    attach_assembly_diagnostics, build_loss_report, DocumentSnapshot, LossReport, NamedSnapshot,
};
