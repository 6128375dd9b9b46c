use std::{collections::BTreeMap, io::Cursor, io::Read, sync::Mutex, time::SystemTime};

use crate::{adapters, model};

#[derive(Clone)]
struct MockObject {
    body: Vec<u8>,
    mimetype: Option<String>,
    storage_class: Option<String>,
    visibility: model::fs::Visibility,
    modified_time: SystemTime,
}

// In-memory stand-in for the vendor client, with the same delimiter and
// marker listing behavior. Signed URLs are deterministic so callers can
// assert on them.
pub struct MockClient {
    objects: Mutex<BTreeMap<String, MockObject>>,
    fail_copy: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            fail_copy: false,
        }
    }

    pub fn failing_copy() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            fail_copy: true,
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl adapters::ObjectAdapter for MockClient {
    fn fs_put_object(
        &self,
        _bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError> {
        let mut objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        objects.insert(
            key.to_string(),
            MockObject {
                body: body.unwrap_or_default(),
                mimetype: config.mimetype.clone(),
                storage_class: config.storage_class.clone(),
                visibility: config
                    .visibility
                    .unwrap_or(model::fs::Visibility::Private),
                modified_time: SystemTime::now(),
            },
        );

        Ok(())
    }

    fn fs_get_object(
        &self,
        _bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::fs::FSError> {
        let objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        Ok(objects.get(key).map(|o| o.body.clone()))
    }

    fn fs_get_object_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Box<dyn Read + Send>>, model::fs::FSError> {
        let body = self.fs_get_object(bucket, key)?;

        Ok(body.map(|b| Box::new(Cursor::new(b)) as Box<dyn Read + Send>))
    }

    fn fs_head_object(
        &self,
        _bucket: &str,
        key: &str,
    ) -> Result<Option<model::fs::FSStat>, model::fs::FSError> {
        let objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        Ok(objects.get(key).map(|o| model::fs::FSStat {
            key: key.to_string(),
            size: o.body.len() as i64,
            mimetype: o.mimetype.clone(),
            storage_class: o.storage_class.clone(),
            modified_time: o.modified_time,
        }))
    }

    fn fs_delete_object(&self, _bucket: &str, key: &str) -> Result<(), model::fs::FSError> {
        let mut objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        objects.remove(key);

        Ok(())
    }

    fn fs_copy_object(
        &self,
        _bucket: &str,
        src_key: &str,
        dst_key: &str,
    ) -> Result<(), model::fs::FSError> {
        if self.fail_copy {
            return Err(model::fs::FSError::Vendor {
                message: format!("failed to copy_object: {} -> {}", src_key, dst_key),
            });
        }

        let mut objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        let src = objects
            .get(src_key)
            .cloned()
            .ok_or(model::fs::FSError::NotFound {
                key: src_key.to_string(),
            })?;

        objects.insert(
            dst_key.to_string(),
            MockObject {
                modified_time: SystemTime::now(),
                ..src
            },
        );

        Ok(())
    }

    fn fs_list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: Option<&str>,
        max_keys: i32,
    ) -> Result<model::fs::FSPage, model::fs::FSError> {
        let guard = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        let mut objects = Vec::new();
        let mut common_prefixes: Vec<String> = Vec::new();
        let mut next_marker = None;
        let mut last_consumed: Option<String> = None;
        let mut count = 0;

        for (key, object) in guard.iter() {
            if !key.starts_with(prefix) {
                continue;
            }

            if let Some(marker) = marker {
                if key.as_str() <= marker {
                    continue;
                }
            }

            let rest = &key[prefix.len()..];
            let grouped = if delimiter.is_empty() {
                None
            } else {
                rest.find(delimiter)
                    .map(|idx| key[..prefix.len() + idx + delimiter.len()].to_string())
            };

            // Keys folding into the current common prefix do not count
            // toward the page size.
            let creates_new = match &grouped {
                Some(group) => common_prefixes.last() != Some(group),
                None => true,
            };

            if creates_new && count >= max_keys {
                next_marker = last_consumed.clone();
                break;
            }

            match grouped {
                Some(group) => {
                    if creates_new {
                        common_prefixes.push(group);
                        count += 1;
                    }
                }
                None => {
                    objects.push(model::fs::FSObject {
                        key: key.clone(),
                        size: object.body.len() as i64,
                        modified_time: object.modified_time,
                    });
                    count += 1;
                }
            }

            last_consumed = Some(key.clone());
        }

        Ok(model::fs::FSPage {
            objects,
            common_prefixes,
            next_marker,
        })
    }

    fn fs_get_object_acl(
        &self,
        _bucket: &str,
        key: &str,
    ) -> Result<Vec<model::fs::FSGrant>, model::fs::FSError> {
        let objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        let object = objects.get(key).ok_or(model::fs::FSError::NotFound {
            key: key.to_string(),
        })?;

        let mut grants = vec![model::fs::FSGrant {
            grantee_uri: None,
            permission: Some("FULL_CONTROL".to_string()),
        }];

        if object.visibility.is_public() {
            grants.push(model::fs::FSGrant {
                grantee_uri: Some(model::fs::PUBLIC_GRANT_URI.to_string()),
                permission: Some("READ".to_string()),
            });
        }

        Ok(grants)
    }

    fn fs_put_object_acl(
        &self,
        _bucket: &str,
        key: &str,
        visibility: model::fs::Visibility,
    ) -> Result<(), model::fs::FSError> {
        let mut objects = self
            .objects
            .lock()
            .expect("failed to acquire `objects` guard");

        let object = objects.get_mut(key).ok_or(model::fs::FSError::NotFound {
            key: key.to_string(),
        })?;

        object.visibility = visibility;

        Ok(())
    }

    fn fs_sign_url(
        &self,
        bucket: &str,
        key: &str,
        method: &str,
        expires_secs: u64,
    ) -> Result<String, model::fs::FSError> {
        Ok(format!(
            "https://{}.mock.example.com/{}?X-Amz-Expires={}&X-Amz-Signature=mock-{}",
            bucket,
            key,
            expires_secs,
            method.to_lowercase()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ObjectAdapter;

    fn seed(client: &MockClient, keys: &[&str]) {
        for key in keys {
            client
                .fs_put_object(
                    "test-bucket",
                    key,
                    Some(b"data".to_vec()),
                    &model::fs::WriteConfig::default(),
                )
                .unwrap();
        }
    }

    #[test]
    fn test_put_get_delete() {
        let client = MockClient::new();

        client
            .fs_put_object(
                "test-bucket",
                "file.txt",
                Some(b"hello".to_vec()),
                &model::fs::WriteConfig::default(),
            )
            .unwrap();

        let body = client.fs_get_object("test-bucket", "file.txt").unwrap();
        assert_eq!(body, Some(b"hello".to_vec()));

        client
            .fs_delete_object("test-bucket", "file.txt")
            .unwrap();
        assert!(client
            .fs_get_object("test-bucket", "file.txt")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_objects_delimiter_grouping() {
        let client = MockClient::new();
        seed(
            &client,
            &["a.txt", "dir/b.txt", "dir/c.txt", "dir2/d.txt"],
        );

        let page = client
            .fs_list_objects("test-bucket", "", "/", None, 1000)
            .unwrap();

        let keys: Vec<&str> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.txt"]);
        assert_eq!(page.common_prefixes, vec!["dir/", "dir2/"]);
        assert!(page.next_marker.is_none());
    }

    #[test]
    fn test_list_objects_pagination() {
        let client = MockClient::new();
        seed(&client, &["k0", "k1", "k2", "k3", "k4"]);

        let mut marker: Option<String> = None;
        let mut keys = Vec::new();
        let mut pages = 0;

        loop {
            let page = client
                .fs_list_objects("test-bucket", "", "/", marker.as_deref(), 2)
                .unwrap();
            pages += 1;

            for o in &page.objects {
                keys.push(o.key.clone());
            }

            marker = page.next_marker;
            if marker.is_none() {
                break;
            }
        }

        assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4"]);
        assert_eq!(pages, 3);
    }

    #[test]
    fn test_list_objects_pagination_with_groups() {
        let client = MockClient::new();
        seed(
            &client,
            &["dir/0", "dir/1", "dir/2", "dir/3", "e.txt"],
        );

        let first = client
            .fs_list_objects("test-bucket", "", "/", None, 1)
            .unwrap();
        assert!(first.objects.is_empty());
        assert_eq!(first.common_prefixes, vec!["dir/"]);
        assert_eq!(first.next_marker.as_deref(), Some("dir/3"));

        let second = client
            .fs_list_objects("test-bucket", "", "/", first.next_marker.as_deref(), 1)
            .unwrap();
        assert_eq!(second.objects.len(), 1);
        assert_eq!(second.objects[0].key, "e.txt");
        assert!(second.common_prefixes.is_empty());
        assert!(second.next_marker.is_none());
    }

    #[test]
    fn test_copy_carries_metadata() {
        let client = MockClient::new();

        client
            .fs_put_object(
                "test-bucket",
                "src.txt",
                Some(b"payload".to_vec()),
                &model::fs::WriteConfig {
                    mimetype: Some("text/plain".to_string()),
                    storage_class: Some("STANDARD_IA".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        client
            .fs_copy_object("test-bucket", "src.txt", "dst.txt")
            .unwrap();

        let stat = client
            .fs_head_object("test-bucket", "dst.txt")
            .unwrap()
            .unwrap();
        assert_eq!(stat.mimetype, Some("text/plain".to_string()));
        assert_eq!(stat.storage_class, Some("STANDARD_IA".to_string()));
        assert_eq!(stat.size, 7);
    }

    #[test]
    fn test_failing_copy() {
        let client = MockClient::failing_copy();
        seed(&client, &["src.txt"]);

        let result = client.fs_copy_object("test-bucket", "src.txt", "dst.txt");
        assert!(result.is_err());
        assert!(client
            .fs_get_object("test-bucket", "dst.txt")
            .unwrap()
            .is_none());
    }
}
