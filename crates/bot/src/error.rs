use {herald_connectors::ConnectorError, thiserror::Error};

#[derive(Debug, Error)]
pub enum BotError {
    #[error("connector `{0}` is already registered")]
    DuplicateRegistration(String),

    #[error("bot already started")]
    AlreadyStarted,

    #[error("failed to start connector `{name}`")]
    Start {
        name: String,
        #[source]
        source: ConnectorError,
    },

    #[error("{} connector(s) failed to close", failures.len())]
    Close {
        failures: Vec<(String, ConnectorError)>,
    },
}
