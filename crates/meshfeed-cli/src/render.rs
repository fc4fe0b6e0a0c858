use std::io::Write;

use meshfeed_core::{
    parse_timestamp, relative_time, FeedConsumer, PageFetcher, Post, Trigger, SEARCH_FALLBACK_URL,
};
use time::OffsetDateTime;

use crate::cli::OutputFormat;
use crate::error::CliError;

const ATTACHMENT_ALT: &str = "Bluesky attachment";

/// Drives a [`FeedConsumer`] and writes what it accumulates.
///
/// Posts go to `out`; loading and status lines go to `status`.
pub struct FeedView<W, S> {
    out: W,
    status: S,
    format: OutputFormat,
    shown: usize,
}

impl<W: Write, S: Write> FeedView<W, S> {
    pub fn new(out: W, status: S, format: OutputFormat) -> Self {
        Self {
            out,
            status,
            format,
            shown: 0,
        }
    }

    /// Applies one trigger, then prints new posts and the resulting state.
    pub async fn step<F>(
        &mut self,
        consumer: &mut FeedConsumer,
        trigger: Trigger,
        fetcher: &F,
    ) -> Result<(), CliError>
    where
        F: PageFetcher + ?Sized,
    {
        let Some(load) = consumer.begin(trigger) else {
            if consumer.is_exhausted() {
                writeln!(self.status, "That's everything for now.")?;
            } else if trigger.is_automatic() && consumer.auto_fetch_halted() {
                writeln!(self.status, "Automatic loading is paused. Press r to retry.")?;
            }
            return Ok(());
        };

        writeln!(self.status, "Loading posts…")?;
        self.status.flush()?;
        let outcome = fetcher.fetch(load.query()).await;
        consumer.complete(load, outcome);

        self.render_new(consumer, OffsetDateTime::now_utc())?;
        self.render_status(consumer)?;
        Ok(())
    }

    fn render_new(&mut self, consumer: &FeedConsumer, now: OffsetDateTime) -> Result<(), CliError> {
        for post in consumer.posts().iter().skip(self.shown) {
            match self.format {
                OutputFormat::Text => write_card(&mut self.out, post, now)?,
                OutputFormat::Ndjson => {
                    serde_json::to_writer(&mut self.out, post)?;
                    writeln!(self.out)?;
                }
            }
        }
        self.shown = consumer.posts().len();
        self.out.flush()?;
        Ok(())
    }

    fn render_status(&mut self, consumer: &FeedConsumer) -> Result<(), CliError> {
        if let Some(error) = consumer.last_error() {
            writeln!(self.status, "Couldn't load the archive.")?;
            writeln!(
                self.status,
                "{error}. Try again (r) or open the feed directly on Bluesky: {SEARCH_FALLBACK_URL}"
            )?;
        } else if consumer.posts().is_empty() {
            writeln!(self.status, "Archive is warming up. Check back soon.")?;
        } else if consumer.is_exhausted() {
            writeln!(self.status, "That's everything for now.")?;
        }
        self.status.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn into_parts(self) -> (W, S) {
        (self.out, self.status)
    }
}

/// Writes one post as a text card.
pub fn write_card(out: &mut impl Write, post: &Post, now: OffsetDateTime) -> std::io::Result<()> {
    let author = &post.author;
    let when = post
        .display_timestamp()
        .and_then(parse_timestamp)
        .map(|then| relative_time(then, now));

    match when {
        Some(when) => writeln!(out, "{} @{} · {}", author.label(), author.handle, when)?,
        None => writeln!(out, "{} @{}", author.label(), author.handle)?,
    }
    if let Some(text) = post.body.text.as_deref().filter(|text| !text.is_empty()) {
        for line in text.lines() {
            writeln!(out, "  {line}")?;
        }
    }
    for item in &post.media {
        if let Some(url) = item.display_url() {
            let alt = item
                .alt_text
                .as_deref()
                .filter(|alt| !alt.is_empty())
                .unwrap_or(ATTACHMENT_ALT);
            writeln!(out, "  [image] {alt}: {url}")?;
        }
    }
    writeln!(out, "  View on Bluesky ↗ {}", post.web_url())?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use meshfeed_core::{
        Author, HttpPageFetcher, HttpResponse, MediaItem, PostBody, ScriptedHttpClient,
    };
    use serde_json::json;

    use super::*;

    fn post(rkey: &str) -> Post {
        Post {
            uri: format!("at://did:plc:x/app.bsky.feed.post/{rkey}"),
            id: format!("cid-{rkey}"),
            author: Author {
                handle: String::from("maker.test"),
                display_name: Some(String::from("Maker")),
                avatar_url: None,
            },
            body: PostBody {
                text: Some(String::from("first line\nsecond line")),
                created_at: Some(String::from("2024-05-01T11:57:00Z")),
            },
            media: vec![
                MediaItem {
                    thumbnail_url: Some(String::from("https://cdn.test/t.jpg")),
                    full_url: None,
                    alt_text: None,
                },
            ],
            indexed_at: None,
        }
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn card_shows_author_time_text_media_and_link() {
        let now = parse_timestamp("2024-05-01T12:00:00Z").unwrap();
        let mut out = Vec::new();

        write_card(&mut out, &post("3kabc"), now).unwrap();

        let card = text(out);
        assert!(card.starts_with("Maker @maker.test · 3 minutes ago\n"));
        assert!(card.contains("  first line\n  second line\n"));
        assert!(card.contains("[image] Bluesky attachment: https://cdn.test/t.jpg"));
        assert!(card.contains("https://bsky.app/profile/maker.test/post/3kabc"));
    }

    fn fetcher_with(response: HttpResponse) -> HttpPageFetcher {
        let http = ScriptedHttpClient::new().with_response("http://feed.test/api/archive", response);
        HttpPageFetcher::new("http://feed.test", Arc::new(http))
    }

    #[tokio::test]
    async fn failure_offers_retry_and_fallback_link() {
        let fetcher = fetcher_with(HttpResponse::new(503, "{}"));
        let mut consumer = FeedConsumer::default();
        let mut view = FeedView::new(Vec::new(), Vec::new(), OutputFormat::Text);

        view.step(&mut consumer, Trigger::Mount, &fetcher).await.unwrap();
        view.step(&mut consumer, Trigger::Proximity, &fetcher).await.unwrap();

        let (_, status) = view.into_parts();
        let status = text(status);
        assert!(status.contains("Request failed with 503. Try again (r)"));
        assert!(status.contains(SEARCH_FALLBACK_URL));
        assert!(status.contains("Automatic loading is paused"));
    }

    #[tokio::test]
    async fn ndjson_prints_each_post_once_and_reports_the_end() {
        let body = json!({
            "cursor": null,
            "posts": [serde_json::to_value(post("a")).unwrap(), serde_json::to_value(post("b")).unwrap()]
        });
        let fetcher = fetcher_with(HttpResponse::ok_json(body.to_string()));
        let mut consumer = FeedConsumer::default();
        let mut view = FeedView::new(Vec::new(), Vec::new(), OutputFormat::Ndjson);

        view.step(&mut consumer, Trigger::Mount, &fetcher).await.unwrap();
        view.step(&mut consumer, Trigger::Proximity, &fetcher).await.unwrap();

        let (out, status) = view.into_parts();
        let lines = text(out).lines().map(str::to_owned).collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"id\":\"cid-a\""));
        assert_eq!(text(status).matches("That's everything for now.").count(), 2);
    }

    #[tokio::test]
    async fn ignored_trigger_prints_no_loading_line() {
        let body = json!({ "cursor": "c1", "posts": [serde_json::to_value(post("a")).unwrap()] });
        let fetcher = fetcher_with(HttpResponse::ok_json(body.to_string()));
        let mut consumer = FeedConsumer::default();
        let mut view = FeedView::new(Vec::new(), Vec::new(), OutputFormat::Ndjson);

        view.step(&mut consumer, Trigger::Mount, &fetcher).await.unwrap();
        view.step(&mut consumer, Trigger::Mount, &fetcher).await.unwrap();

        let (out, status) = view.into_parts();
        assert_eq!(text(out).lines().count(), 1);
        assert_eq!(text(status).matches("Loading posts…").count(), 1);
    }

    #[tokio::test]
    async fn empty_first_page_reports_warming_up() {
        let fetcher = fetcher_with(HttpResponse::ok_json(r#"{"cursor":"c1","posts":[]}"#));
        let mut consumer = FeedConsumer::default();
        let mut view = FeedView::new(Vec::new(), Vec::new(), OutputFormat::Text);

        view.step(&mut consumer, Trigger::Mount, &fetcher).await.unwrap();

        let (_, status) = view.into_parts();
        assert!(text(status).contains("Archive is warming up"));
    }
}
