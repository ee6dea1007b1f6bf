/// Sends rendered claim text out to the social platform. The production
/// implementor wraps the real API client and its credentials;
/// [`LogPoster`] stands in everywhere else.
pub trait Poster {
    /// Post the text, returning the platform's identifier for the new post.
    fn post(&self, text: &str) -> anyhow::Result<String>;
}

/// Logs the text instead of posting it.
pub struct LogPoster;

impl Poster for LogPoster {
    fn post(&self, text: &str) -> anyhow::Result<String> {
        log::info!("dry run, not posting:\n{text}");
        Ok("dry-run".to_string())
    }
}
