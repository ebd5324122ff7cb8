use async_trait::async_trait;

/// What a fetcher hands back for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// Address the page finally settled on, after redirects
    pub resolved: String,
    /// Absolute targets of the page's hyperlinks
    pub links: Vec<String>,
    /// Visible text of the rendered page
    pub text: String,
}

#[async_trait]
pub trait PageFetcher: Send + 'static {
    async fn fetch(&mut self, domain: &str) -> anyhow::Result<FetchedPage>;

    async fn close(self) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
