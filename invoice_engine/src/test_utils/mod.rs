pub mod collaborators;
pub mod prepare_env;
