pub mod directive_audit;
