//! The channel the server publishes client messages through.

use lsp_server::Notification;

/// Sends messages to the client. The embedder drains the other end of the
/// channel into its transport.
#[derive(Clone)]
pub struct ClientSender {
    sender: crossbeam::channel::Sender<lsp_server::Message>,
}

impl ClientSender {
    pub fn new(sender: crossbeam::channel::Sender<lsp_server::Message>) -> Self {
        Self { sender }
    }

    pub(crate) fn send(&self, message: lsp_server::Message) -> crate::Result<()> {
        self.sender
            .send(message)
            .map_err(|error| anyhow::anyhow!("failed to send message to the client: {error}"))
    }
}

pub struct Client {
    notifier: Notifier,
}

#[derive(Clone)]
pub struct Notifier(ClientSender);

impl Client {
    pub fn new(sender: ClientSender) -> Self {
        Self {
            notifier: Notifier(sender),
        }
    }

    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }
}

impl Notifier {
    pub fn notify<N>(&self, params: N::Params) -> crate::Result<()>
    where
        N: lsp_types::notification::Notification,
    {
        let method = N::METHOD.to_string();
        self.0
            .send(lsp_server::Message::Notification(Notification::new(
                method, params,
            )))
    }
}
