pub mod constants;
pub mod groovy_support;
pub mod symbols;

pub use groovy_support::GroovySupport;
