pub mod deploy;

pub use deploy::{DeployReport, DeployStatus, Deployer};
