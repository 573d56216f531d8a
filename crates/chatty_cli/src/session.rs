//! A conversation with the assistant.

use std::io::Write;

use chatty_client::{ChatRequest, Client, Message};
use chatty_md::{Formatter, Render};
use chatty_stream::{DecoderConfig, ResponseFilter, Transcript};
use crossterm::style::Stylize as _;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    printer::Printer,
    store::{SessionSummary, Store},
};

/// Width of the separator above a markdown re-render.
const SEPARATOR_WIDTH: usize = 40;

/// Longest accepted prompt, in characters.
pub(crate) const MAX_PROMPT_LENGTH: usize = 50_000;

/// A conversation, optionally saved to a [`Store`].
///
/// Only completed replies are recorded. A failed request leaves the history as
/// it was before the prompt was sent, and saves nothing to the [`Store`].
pub(crate) struct Session {
    client: Client,
    model: String,
    temperature: f64,
    stream: bool,
    colors: bool,
    markdown: bool,
    filter: ResponseFilter,
    renderer: Box<dyn Render + Send + Sync>,
    history: Vec<Message>,
    store: Option<Store>,

    /// The saved session the history belongs to, once one exists.
    session_id: Option<i64>,
}

impl Session {
    pub(crate) fn new(client: Client, config: &Config) -> Self {
        info!(
            model = %config.model.name,
            url = client.base_url(),
            stream = config.model.stream,
            "Starting session."
        );

        let mut formatter = Formatter::new();
        if let Some(theme) = &config.ui.theme {
            formatter = formatter.theme(theme);
        }

        Self {
            client,
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            stream: config.model.stream,
            colors: config.ui.colors,
            markdown: config.ui.markdown,
            filter: ResponseFilter::new(DecoderConfig {
                max_line_length: config.stream.max_line_length,
            }),
            renderer: Box::new(formatter),
            history: vec![],
            store: None,
            session_id: None,
        }
    }

    /// Save completed exchanges to `store`.
    pub(crate) fn with_store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_renderer(mut self, renderer: impl Render + Send + Sync + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub(crate) fn history(&self) -> &[Message] {
        &self.history
    }

    pub(crate) fn reset(&mut self) {
        debug!(messages = self.history.len(), "Clearing conversation history.");
        self.history.clear();
        self.session_id = None;
    }

    /// Saved sessions, most recently active first.
    pub(crate) fn sessions(&self) -> Result<Vec<SessionSummary>> {
        self.store()?.list()
    }

    /// Replace the history with a saved session, and continue it.
    pub(crate) fn load(&mut self, id: i64) -> Result<SessionSummary> {
        let saved = self.store()?.load(id)?;

        self.history = saved.messages;
        self.session_id = Some(saved.summary.id);

        Ok(saved.summary)
    }

    fn store(&self) -> Result<&Store> {
        self.store.as_ref().ok_or(Error::PersistenceDisabled)
    }

    /// Toggle the markdown re-render, returning the new state.
    pub(crate) fn toggle_markdown(&mut self) -> bool {
        self.markdown = !self.markdown;
        self.markdown
    }

    /// Send a prompt and print the reply to `out`.
    pub(crate) async fn send(&mut self, prompt: &str, out: &mut dyn Write) -> Result<Transcript> {
        if prompt.chars().count() > MAX_PROMPT_LENGTH {
            return Err(Error::PromptTooLong {
                max: MAX_PROMPT_LENGTH,
            });
        }

        self.history.push(Message::user(prompt));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: self.history.clone(),
            temperature: self.temperature,
        };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream = self.stream,
            "Sending chat request."
        );

        let result = if self.stream {
            self.stream_reply(&request, out).await
        } else {
            self.complete_reply(&request, out).await
        };

        let transcript = match result {
            Ok(transcript) => transcript,
            Err(error) => {
                warn!(%error, "Chat request failed. Discarding prompt from history.");
                self.history.pop();
                return Err(error);
            }
        };

        self.history
            .push(Message::assistant(transcript.full_text.clone()));
        self.save_exchange(prompt, &transcript.full_text);
        self.render(&transcript, out)?;

        Ok(transcript)
    }

    async fn stream_reply(&self, request: &ChatRequest, out: &mut dyn Write) -> Result<Transcript> {
        let reader = self.client.chat_stream(request).await?;

        let mut printer = Printer::new(&mut *out, self.colors);
        let result = self.filter.run(reader, &mut printer).await;
        printer.finish()?;

        Ok(result?)
    }

    async fn complete_reply(
        &self,
        request: &ChatRequest,
        out: &mut dyn Write,
    ) -> Result<Transcript> {
        let reply = self.client.chat(request).await?;

        let mut printer = Printer::new(&mut *out, self.colors);
        let transcript = ResponseFilter::run_text(&reply, &mut printer)?;
        printer.finish()?;

        Ok(transcript)
    }

    /// Save a completed exchange, starting a saved session if needed.
    ///
    /// A failure is logged and leaves the in-memory history intact.
    fn save_exchange(&mut self, prompt: &str, reply: &str) {
        let Some(store) = &self.store else {
            return;
        };

        let result = match self.session_id {
            Some(id) => Ok(id),
            None => store.create_session(prompt),
        }
        .and_then(|id| {
            store.append(id, &[Message::user(prompt), Message::assistant(reply)])?;
            Ok(id)
        });

        match result {
            Ok(id) => self.session_id = Some(id),
            Err(error) => error!(%error, "Failed to save conversation."),
        }
    }

    /// Print the markdown re-render of a completed reply, if there is one.
    ///
    /// A render failure leaves the plain output as the only output.
    fn render(&self, transcript: &Transcript, out: &mut dyn Write) -> Result<()> {
        if !self.markdown || !self.colors {
            return Ok(());
        }

        let source = transcript.render_source().trim();
        if source.is_empty() {
            return Ok(());
        }

        let rendered = match self.renderer.render(source) {
            Ok(rendered) if !rendered.is_empty() => rendered,
            Ok(_) => return Ok(()),
            Err(error) => {
                warn!(%error, "Failed to render markdown.");
                return Ok(());
            }
        };

        writeln!(out, "{}", "─".repeat(SEPARATOR_WIDTH).dark_yellow().dim())?;
        out.write_all(rendered.as_bytes())?;
        out.flush()?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
