use std::io::Read;

use crate::model;

pub mod mock;
pub mod s3;

// The vendor operations the adapter consumes, and nothing else. Absence is
// `Ok(None)` on the read-style calls; every other vendor failure is an
// `FSError`.
pub trait ObjectAdapter {
    fn fs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Option<Vec<u8>>,
        config: &model::fs::WriteConfig,
    ) -> Result<(), model::fs::FSError>;

    fn fs_get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::fs::FSError>;

    fn fs_get_object_stream(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Box<dyn Read + Send>>, model::fs::FSError>;

    fn fs_head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::fs::FSStat>, model::fs::FSError>;

    fn fs_delete_object(&self, bucket: &str, key: &str) -> Result<(), model::fs::FSError>;

    fn fs_copy_object(
        &self,
        bucket: &str,
        src_key: &str,
        dst_key: &str,
    ) -> Result<(), model::fs::FSError>;

    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
        marker: Option<&str>,
        max_keys: i32,
    ) -> Result<model::fs::FSPage, model::fs::FSError>;

    fn fs_get_object_acl(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Vec<model::fs::FSGrant>, model::fs::FSError>;

    fn fs_put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        visibility: model::fs::Visibility,
    ) -> Result<(), model::fs::FSError>;

    fn fs_sign_url(
        &self,
        bucket: &str,
        key: &str,
        method: &str,
        expires_secs: u64,
    ) -> Result<String, model::fs::FSError>;
}
