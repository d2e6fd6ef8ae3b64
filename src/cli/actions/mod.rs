pub mod server;

use crate::idp::IdpConfig;

#[derive(Debug)]
pub enum Action {
    Server { port: u16, config: IdpConfig },
}
