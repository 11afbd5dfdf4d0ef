use anyhow::{Context, anyhow};
use bytes::Bytes;
use s3::{Bucket, BucketConfiguration, Region, creds::Credentials, error::S3Error};
use stash_core::store::{
    ByteStream, ListStream, ObjectInfo, StoreError, StoreFeatures, StoreResult,
};
use tokio_util::io::{ReaderStream, StreamReader};

/// S3 caps a single ListObjectsV2 page at 1000 keys.
const LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct S3StoreConfig {
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    pub bucket_name: String,
    pub access_key: String,
    pub secret_key: String,
    /// Create the bucket on startup when it does not exist yet.
    #[serde(default)]
    pub create_bucket: bool,
}

#[derive(Debug, Clone)]
pub struct S3Store {
    bucket: Box<Bucket>,
}

impl S3Store {
    pub fn create(config: S3StoreConfig) -> anyhow::Result<Self> {
        let bucket = Bucket::new(
            &config.bucket_name,
            region(&config),
            credentials(&config)?,
        )
        .context("invalid s3 bucket configuration")?
        .with_path_style();
        s3::set_retries(5);
        Ok(Self { bucket })
    }

    /// Connects to the configured bucket, creating it first if
    /// `create_bucket` is set and the bucket is missing.
    pub async fn open(config: S3StoreConfig) -> anyhow::Result<Self> {
        let store = Self::create(config.clone())?;
        if config.create_bucket && !store.bucket.exists().await? {
            tracing::info!("creating missing bucket {}", config.bucket_name);
            Bucket::create_with_path_style(
                &config.bucket_name,
                region(&config),
                credentials(&config)?,
                BucketConfiguration::default(),
            )
            .await
            .with_context(|| format!("bucket creation error: {}", config.bucket_name))?;
        }
        Ok(store)
    }
}

fn region(config: &S3StoreConfig) -> Region {
    Region::Custom {
        endpoint: config.endpoint.clone(),
        region: config.region.clone(),
    }
}

fn credentials(config: &S3StoreConfig) -> anyhow::Result<Credentials> {
    Credentials::new(
        Some(&config.access_key),
        Some(&config.secret_key),
        None,
        None,
        None,
    )
    .context("invalid s3 credentials")
}

/// Maps HTTP 404 onto the distinguished not-found error.
fn store_err(e: S3Error) -> StoreError {
    match e {
        S3Error::HttpFailWithBody(404, _) => StoreError::NotFound,
        e => StoreError::Other(e.into()),
    }
}

#[async_trait::async_trait]
impl stash_core::store::Store for S3Store {
    async fn put_stream(
        &self,
        key: &str,
        stream: ByteStream,
        content_type: &str,
    ) -> StoreResult<()> {
        let mut reader = StreamReader::new(stream);
        self.bucket
            .put_object_stream_with_content_type(&mut reader, key, content_type)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn put_bytes(&self, key: &str, bytes: Bytes, content_type: &str) -> StoreResult<()> {
        self.bucket
            .put_object_with_content_type(key, &bytes, content_type)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    fn features(&self) -> StoreFeatures {
        StoreFeatures {
            case_sensitive: true,
            max_list_page_size: LIST_PAGE_SIZE,
        }
    }

    async fn stat(&self, key: &str) -> StoreResult<ObjectInfo> {
        let (head, code) = self.bucket.head_object(key).await.map_err(store_err)?;
        match code {
            200 => {}
            404 => return Err(StoreError::NotFound),
            code => return Err(anyhow!("unexpected http status code {code}").into()),
        }
        let len = head
            .content_length
            .ok_or_else(|| anyhow!("missing content-length"))?;
        let size = u64::try_from(len).map_err(|e| StoreError::Other(e.into()))?;
        Ok(ObjectInfo::new(key, size))
    }

    async fn list(
        &self,
        prefix: &str,
        recursive: bool,
        limit: Option<usize>,
    ) -> StoreResult<ListStream> {
        let limit = limit.unwrap_or(usize::MAX);
        let delimiter = (!recursive).then(|| "/".to_string());
        let mut entries: Vec<StoreResult<ObjectInfo>> = Vec::new();
        let mut continuation_token = None;

        while entries.len() < limit {
            let page_size = (limit - entries.len()).min(self.features().max_list_page_size);
            let (page, _) = self
                .bucket
                .list_page(
                    prefix.to_string(),
                    delimiter.clone(),
                    continuation_token.take(),
                    None,
                    Some(page_size),
                )
                .await
                .map_err(store_err)?;

            entries.extend(
                page.contents
                    .into_iter()
                    .map(|obj| Ok(ObjectInfo::new(obj.key, obj.size))),
            );
            entries.extend(
                page.common_prefixes
                    .into_iter()
                    .flatten()
                    .map(|p| Ok(ObjectInfo::new(p.prefix, 0))),
            );

            match page.next_continuation_token {
                Some(token) if page.is_truncated => continuation_token = Some(token),
                _ => break,
            }
        }

        entries.truncate(limit);
        Ok(Box::new(futures::stream::iter(entries)))
    }

    async fn open_read_stream(&self, key: &str) -> StoreResult<ByteStream> {
        let response_data = self.bucket.get_object_stream(key).await.map_err(store_err)?;
        let stream = ReaderStream::new(response_data);
        Ok(Box::new(stream))
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> StoreResult<()> {
        match self
            .bucket
            .copy_object_internal(src_key, dst_key)
            .await
            .map_err(store_err)?
        {
            200 => Ok(()),
            404 => Err(StoreError::NotFound),
            code => Err(anyhow!("unexpected http status code {code} on copy").into()),
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.bucket.delete_object(key).await.map_err(store_err)?;
        Ok(())
    }
}
