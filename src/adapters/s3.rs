use std::{
    io::Read,
    time::{Duration, SystemTime},
};

use aws_sdk_s3::{
    presigning::PresigningConfig,
    primitives::{ByteStream, DateTime},
    types::{MetadataDirective, ObjectCannedAcl, StorageClass},
};

use crate::{adapters, model, util};

fn canned_acl(visibility: model::fs::Visibility) -> ObjectCannedAcl {
    match visibility {
        model::fs::Visibility::Public => ObjectCannedAcl::PublicRead,
        model::fs::Visibility::Private => ObjectCannedAcl::Private,
    }
}

fn modified_time(last_modified: Option<&DateTime>) -> SystemTime {
    match last_modified {
        Some(dt) => SystemTime::UNIX_EPOCH + Duration::new(dt.secs() as u64, dt.subsec_nanos()),
        None => SystemTime::UNIX_EPOCH,
    }
}

// Hands the vendor transport stream to the caller as a blocking reader. The
// sequence is finite and cannot be restarted.
pub struct BodyReader {
    body: ByteStream,
    chunk: Vec<u8>,
    pos: usize,
    done: bool,
}

impl BodyReader {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            chunk: Vec::new(),
            pos: 0,
            done: false,
        }
    }
}

impl Read for BodyReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        while self.pos == self.chunk.len() {
            if self.done {
                return Ok(0);
            }

            match util::poll::poll_until_ready_error(self.body.try_next()) {
                Ok(Some(chunk)) => {
                    self.chunk = chunk.to_vec();
                    self.pos = 0;
                }
                Ok(None) => {
                    self.done = true;
                    return Ok(0);
                }
                Err(err) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        err.to_string(),
                    ));
                }
            }
        }

        let n = (self.chunk.len() - self.pos).min(out.len());
        out[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;

        Ok(n)
    }
}

impl adapters::ObjectAdapter for aws_sdk_s3::Client {
    fn fs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        let mut req = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body.unwrap_or_default()));

        if let Some(visibility) = config.visibility {
            req = req.acl(canned_acl(visibility));
        }

        if let Some(mimetype) = &config.mimetype {
            req = req.content_type(mimetype);
        }

        if let Some(expires) = config.expires {
            req = req.expires(DateTime::from_secs(expires));
        }

        if let Some(storage_class) = &config.storage_class {
            req = req.storage_class(StorageClass::from(storage_class.as_str()));
        }

        util::poll::poll_until_ready_error(req.send()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to put_object at: {}, {}", key, err),
            }
        })?;

        Ok(())
    }

    fn fs_get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::fs::FSError> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = match util::poll::poll_until_ready_error(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Ok(None);
                    }
                }

                return Err(model::fs::FSError::Vendor {
                    message: format!("failed to get_object: {}, {}", key, err),
                });
            }
            Ok(o) => o,
        };

        let bytes = util::poll::poll_until_ready_error(o.body.collect()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to collect body: {}, {}", key, err),
            }
        })?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }

    fn fs_get_object_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Box<dyn Read + Send>>, model::fs::FSError> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = match util::poll::poll_until_ready_error(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Ok(None);
                    }
                }

                return Err(model::fs::FSError::Vendor {
                    message: format!("failed to get_object: {}, {}", key, err),
                });
            }
            Ok(o) => o,
        };

        Ok(Some(Box::new(BodyReader::new(o.body))))
    }

    fn fs_head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::fs::FSStat>, model::fs::FSError> {
        let req = self.head_object().bucket(bucket).key(key);

        let ho = match util::poll::poll_until_ready_error(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(None);
                    }
                }

                return Err(model::fs::FSError::Vendor {
                    message: format!("failed to head_object: {}, {}", key, err),
                });
            }
            Ok(ho) => ho,
        };

        Ok(Some(model::fs::FSStat {
            key: key.to_string(),
            size: ho.content_length().unwrap_or(0),
            mimetype: ho.content_type().map(|m| m.to_string()),
            storage_class: ho.storage_class().map(|s| s.as_str().to_string()),
            modified_time: modified_time(ho.last_modified()),
        }))
    }

    fn fs_delete_object(&self, bucket: &str, key: &str) -> Result<(), model::fs::FSError> {
        let req = self.delete_object().bucket(bucket).key(key);

        util::poll::poll_until_ready_error(req.send()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to delete_object: {}, {}", key, err),
            }
        })?;

        Ok(())
    }

    fn fs_copy_object(
        &self,
        bucket: &str,
        src_key: &str,
        dst_key: &str,
    ) -> Result<(), model::fs::FSError> {
        let req = self
            .copy_object()
            .bucket(bucket)
            .key(dst_key)
            .copy_source(format!("{}/{}", bucket, src_key))
            .metadata_directive(MetadataDirective::Copy);

        util::poll::poll_until_ready_error(req.send()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to copy_object: {} -> {}, {}", src_key, dst_key, err),
            }
        })?;

        Ok(())
    }

    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: Option<&str>,
        max_keys: i32,
    ) -> Result<model::fs::FSPage, model::fs::FSError> {
        let mut req = self
            .list_objects()
            .bucket(bucket)
            .prefix(prefix)
            .delimiter(delimiter)
            .max_keys(max_keys);

        if let Some(marker) = marker {
            req = req.marker(marker);
        }

        let lo = util::poll::poll_until_ready_error(req.send()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to list_objects at: {}, {}", prefix, err),
            }
        })?;

        let mut objects = Vec::new();
        for o in lo.contents() {
            objects.push(model::fs::FSObject {
                key: o.key().unwrap_or("").to_string(),
                size: o.size().unwrap_or(0),
                modified_time: modified_time(o.last_modified()),
            });
        }

        let common_prefixes = lo
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(|s| s.to_string()))
            .collect();

        let next_marker = lo
            .next_marker()
            .filter(|m| !m.is_empty())
            .map(|m| m.to_string());

        Ok(model::fs::FSPage {
            objects,
            common_prefixes,
            next_marker,
        })
    }

    fn fs_get_object_acl(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<model::fs::FSGrant>, model::fs::FSError> {
        let req = self.get_object_acl().bucket(bucket).key(key);

        let ao = util::poll::poll_until_ready_error(req.send()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to get_object_acl: {}, {}", key, err),
            }
        })?;

        let grants = ao
            .grants()
            .iter()
            .map(|grant| model::fs::FSGrant {
                grantee_uri: grant
                    .grantee()
                    .and_then(|g| g.uri())
                    .map(|u| u.to_string()),
                permission: grant.permission().map(|p| p.as_str().to_string()),
            })
            .collect();

        Ok(grants)
    }

    fn fs_put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        visibility: model::fs::Visibility,
    ) -> Result<(), model::fs::FSError> {
        let req = self
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(canned_acl(visibility));

        util::poll::poll_until_ready_error(req.send()).map_err(|err| {
            model::fs::FSError::Vendor {
                message: format!("failed to put_object_acl: {}, {}", key, err),
            }
        })?;

        Ok(())
    }

    fn fs_sign_url(
        &self,
        bucket: &str,
        key: &str,
        method: &str,
        expires_secs: u64,
    ) -> Result<String, model::fs::FSError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(expires_secs)).map_err(
            |err| model::fs::FSError::Config {
                message: format!("failed to build presigning config: {}", err),
            },
        )?;

        let presigned = match method {
            "GET" => util::poll::poll_until_ready_error(
                self.get_object().bucket(bucket).key(key).presigned(config),
            )
            .map_err(|err| model::fs::FSError::Vendor {
                message: format!("failed to sign_url: {}, {}", key, err),
            })?,
            "PUT" => util::poll::poll_until_ready_error(
                self.put_object().bucket(bucket).key(key).presigned(config),
            )
            .map_err(|err| model::fs::FSError::Vendor {
                message: format!("failed to sign_url: {}, {}", key, err),
            })?,
            _ => {
                return Err(model::fs::FSError::Config {
                    message: format!("unsupported sign method: {}", method),
                });
            }
        };

        Ok(presigned.uri().to_string())
    }
}
