pub mod action;
pub mod site;

pub use action::{
    ActionKind, ActionPlan, ActionPlanSummary, EntityMatch, ParameterSource, ParameterType,
    RouteParameter,
};
pub use site::{
    ColumnSpec, ConfigurationError, EntityDefinition, ParameterSpec, RoutePattern, SchemaSpec,
    SiteConfiguration, TableSpec,
};
