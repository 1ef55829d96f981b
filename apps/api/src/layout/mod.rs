// Layout budgets: template catalog, per-page capacity, renderer omission table.
// No rendering happens here; the renderer is an external collaborator.

pub mod budget;
pub mod templates;

pub use budget::LayoutBudget;
pub use templates::{find_template, OmittableField, Template, TemplateDescriptor, TEMPLATES};
