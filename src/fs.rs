use std::{io::Read, time::SystemTime};

use tracing::debug;

use crate::{adapters, model, util};

const MAX_KEYS: i32 = 1000;

fn epoch_secs(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct ObjectFS {
    pub client: Box<dyn adapters::ObjectAdapter>,
    pub endpoint: String,
    pub options: model::fs::AdapterOptions,
    bucket: String,
    prefix: String,
}

impl ObjectFS {
    pub fn new(
        client: Box<dyn adapters::ObjectAdapter>,
        endpoint: &str,
        bucket: &str,
        prefix: &str,
        options: model::fs::AdapterOptions,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            options,
            bucket: bucket.to_string(),
            prefix: util::object::normalize_prefix(prefix),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn set_bucket(&mut self, bucket: &str) {
        self.bucket = bucket.to_string();
    }

    fn key_for(&self, path: &str) -> String {
        util::object::apply_prefix(&self.prefix, path)
    }

    pub fn write(
        &self,
        path: &str,
        contents: &[u8],
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        let key = self.key_for(path);
        let merged = config.merged_over(&self.options.defaults);
        debug!(key = %key, size = contents.len(), "write");

        self.client
            .fs_put_object(&self.bucket, &key, Some(contents.to_vec()), &merged)
    }

    // Buffers the whole reader before the put goes out. There is no
    // streaming upload path.
    pub fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents)?;

        self.write(path, &contents, config)
    }

    pub fn update(
        &self,
        path: &str,
        contents: &[u8],
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        self.write(path, contents, config)
    }

    pub fn update_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        self.write_stream(path, reader, config)
    }

    pub fn read(&self, path: &str) -> Result<Option<Vec<u8>>, model::fs::FSError> {
        let key = self.key_for(path);

        self.client.fs_get_object(&self.bucket, &key)
    }

    pub fn read_stream(
        &self,
        path: &str,
    ) -> Result<Option<Box<dyn Read + Send>>, model::fs::FSError> {
        let key = self.key_for(path);

        self.client.fs_get_object_stream(&self.bucket, &key)
    }

    pub fn copy(&self, path: &str, newpath: &str) -> Result<(), model::fs::FSError> {
        let src_key = self.key_for(path);
        let dst_key = self.key_for(newpath);
        debug!(src = %src_key, dst = %dst_key, "copy");

        self.client
            .fs_copy_object(&self.bucket, &src_key, &dst_key)
    }

    // Copy first; the source is only deleted once the copy went through.
    pub fn rename(&self, path: &str, newpath: &str) -> Result<bool, model::fs::FSError> {
        self.copy(path, newpath)?;

        self.delete(path)
    }

    // The extra existence check covers stores where a delete is not
    // immediately visible.
    pub fn delete(&self, path: &str) -> Result<bool, model::fs::FSError> {
        let key = self.key_for(path);
        debug!(key = %key, "delete");

        self.client.fs_delete_object(&self.bucket, &key)?;

        Ok(!self.has(path)?)
    }

    pub fn delete_dir(&self, dirname: &str) -> Result<bool, model::fs::FSError> {
        let marker = util::object::dir_key(dirname);
        let prefix = self.key_for(&marker);
        debug!(prefix = %prefix, "delete_dir");

        self.delete_dir_objects(&prefix)?;

        Ok(!self.has(&marker)?)
    }

    fn delete_dir_objects(&self, prefix: &str) -> Result<(), model::fs::FSError> {
        let listing = self.list_dir_objects(prefix, false)?;

        // Each level's listing includes its own directory marker, so the
        // markers go with the members.
        for object in &listing.objects {
            self.client.fs_delete_object(&self.bucket, &object.key)?;
        }

        for sub in &listing.prefixes {
            self.delete_dir_objects(sub)?;
        }

        Ok(())
    }

    pub fn create_dir(
        &self,
        dirname: &str,
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        let key = self.key_for(&util::object::dir_key(dirname));
        let merged = config.merged_over(&self.options.defaults);
        debug!(key = %key, "create_dir");

        self.client.fs_put_object(&self.bucket, &key, None, &merged)
    }

    pub fn has(&self, path: &str) -> Result<bool, model::fs::FSError> {
        Ok(self.metadata(path)?.is_some())
    }

    pub fn metadata(&self, path: &str) -> Result<Option<model::fs::Entry>, model::fs::FSError> {
        let key = self.key_for(path);

        let stat = match self.client.fs_head_object(&self.bucket, &key)? {
            None => return Ok(None),
            Some(stat) => stat,
        };

        let logical = util::object::remove_prefix(&self.prefix, &key);
        if util::object::is_dir_key(&logical) {
            return Ok(Some(model::fs::Entry::Dir {
                path: logical.trim_end_matches('/').to_string(),
            }));
        }

        Ok(Some(model::fs::Entry::File {
            path: logical,
            size: stat.size,
            mimetype: stat.mimetype,
            timestamp: epoch_secs(stat.modified_time),
        }))
    }

    pub fn size(&self, path: &str) -> Result<Option<i64>, model::fs::FSError> {
        Ok(match self.metadata(path)? {
            Some(model::fs::Entry::File { size, .. }) => Some(size),
            _ => None,
        })
    }

    pub fn mimetype(&self, path: &str) -> Result<Option<String>, model::fs::FSError> {
        Ok(match self.metadata(path)? {
            Some(model::fs::Entry::File { mimetype, .. }) => mimetype,
            _ => None,
        })
    }

    pub fn timestamp(&self, path: &str) -> Result<Option<i64>, model::fs::FSError> {
        Ok(match self.metadata(path)? {
            Some(model::fs::Entry::File { timestamp, .. }) => Some(timestamp),
            _ => None,
        })
    }

    pub fn list_contents(
        &self,
        directory: &str,
        recursive: bool,
    ) -> Result<Vec<model::fs::Entry>, model::fs::FSError> {
        let directory = if directory.is_empty() || directory.ends_with('/') {
            directory.to_string()
        } else {
            format!("{}/", directory)
        };

        let prefix = self.key_for(&directory);
        let listing = self.list_dir_objects(&prefix, recursive)?;

        let mut entries = Vec::new();
        for object in &listing.objects {
            let logical = util::object::remove_prefix(&self.prefix, &object.key);
            match self.metadata(&logical)? {
                None => continue,
                Some(entry) => entries.push(entry),
            }
        }

        for dir in &listing.prefixes {
            let logical = util::object::remove_prefix(&self.prefix, dir);
            entries.push(model::fs::Entry::Dir {
                path: logical.trim_end_matches('/').to_string(),
            });
        }

        Ok(entries)
    }

    // `dirname` is already a full storage prefix. Pages are chased until the
    // vendor stops handing back a marker; recursion happens once the level
    // is fully paged.
    fn list_dir_objects(
        &self,
        dirname: &str,
        recursive: bool,
    ) -> Result<model::fs::FSListing, model::fs::FSError> {
        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self.client.fs_list_objects(
                &self.bucket,
                dirname,
                "/",
                marker.as_deref(),
                MAX_KEYS,
            )?;

            objects.extend(page.objects);
            prefixes.extend(page.common_prefixes);

            marker = page.next_marker;
            if marker.is_none() {
                break;
            }
        }

        if recursive {
            for prefix in &prefixes {
                let next = self.list_dir_objects(prefix, recursive)?;
                objects.extend(next.objects);
            }
        }

        Ok(model::fs::FSListing { objects, prefixes })
    }

    pub fn set_visibility(
        &self,
        path: &str,
        visibility: model::fs::Visibility,
    ) -> Result<(), model::fs::FSError> {
        let key = self.key_for(path);
        debug!(key = %key, visibility = visibility.as_str(), "set_visibility");

        self.client
            .fs_put_object_acl(&self.bucket, &key, visibility)
    }

    pub fn get_visibility(&self, path: &str) -> Result<model::fs::Visibility, model::fs::FSError> {
        let key = self.key_for(path);

        let grants = self.client.fs_get_object_acl(&self.bucket, &key)?;
        for grant in &grants {
            if grant.grantee_uri.as_deref() != Some(model::fs::PUBLIC_GRANT_URI) {
                continue;
            }

            if grant.permission.as_deref() != Some("READ") {
                continue;
            }

            return Ok(model::fs::Visibility::Public);
        }

        Ok(model::fs::Visibility::Private)
    }

    pub fn sign_url(
        &self,
        path: &str,
        expiration: model::fs::Expiry,
        method: &str,
    ) -> Result<String, model::fs::FSError> {
        let key = self.key_for(path);

        self.client
            .fs_sign_url(&self.bucket, &key, method, expiration.relative_secs())
    }

    pub fn temporary_url(
        &self,
        path: &str,
        expiration: model::fs::Expiry,
        method: &str,
    ) -> Result<String, model::fs::FSError> {
        let url = self.sign_url(path, expiration, method)?;

        match &self.options.temporary_url {
            Some(base) => util::object::replace_base_url(&url, base),
            None => Ok(url),
        }
    }

    pub fn url(&self, path: &str) -> Result<String, model::fs::FSError> {
        let key = self.key_for(path);

        if let Some(base) = &self.options.url {
            return Ok(util::object::concat_path_to_url(base, &key));
        }

        let host =
            util::object::normalize_host(&self.endpoint, &self.bucket, self.options.bucket_endpoint)?;

        Ok(format!("{}{}", host, key.trim_start_matches('/')))
    }
}
