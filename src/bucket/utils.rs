// Copyright 2025 xlstore Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use regex::Regex;

use crate::error::{Result, StorageError};

lazy_static::lazy_static! {
    static ref VALID_BUCKET_NAME: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\.\-\_\:]{1,61}[A-Za-z0-9]$").unwrap();
    static ref IP_ADDRESS: Regex = Regex::new(r"^(\d+\.){3}\d+$").unwrap();
}

pub fn is_valid_bucket_name(bucket: &str) -> bool {
    let bucket = bucket.trim();

    if bucket.len() < 3 || bucket.len() > 63 {
        return false;
    }
    if IP_ADDRESS.is_match(bucket) {
        return false;
    }
    if bucket.contains("..") || bucket.contains(".-") || bucket.contains("-.") {
        return false;
    }

    VALID_BUCKET_NAME.is_match(bucket)
}

pub fn is_valid_object_name(object: &str) -> bool {
    if object.is_empty() || object.starts_with('/') {
        return false;
    }

    is_valid_object_prefix(object)
}

pub fn is_valid_object_prefix(object: &str) -> bool {
    if object.len() > 1024 {
        return false;
    }
    if object.contains('\0') {
        return false;
    }
    // path segments may not navigate
    !object.split('/').any(|seg| seg == ".." || seg == ".")
}

fn check_bucket_and_object_names(bucket: &str, object: &str) -> Result<()> {
    if !is_valid_bucket_name(bucket) {
        return Err(StorageError::BucketNameInvalid(bucket.to_owned()));
    }

    if !is_valid_object_name(object) {
        return Err(StorageError::ObjectNameInvalid(bucket.to_owned(), object.to_owned()));
    }

    Ok(())
}

pub fn check_new_multipart_args(bucket: &str, object: &str) -> Result<()> {
    check_bucket_and_object_names(bucket, object)
}

fn check_multipart_object_args(bucket: &str, object: &str, upload_id: &str) -> Result<()> {
    check_bucket_and_object_names(bucket, object)?;

    if upload_id.is_empty() {
        return Err(StorageError::InvalidUploadID(
            bucket.to_owned(),
            object.to_owned(),
            upload_id.to_owned(),
        ));
    }

    Ok(())
}

pub fn check_put_object_part_args(bucket: &str, object: &str, upload_id: &str) -> Result<()> {
    check_multipart_object_args(bucket, object, upload_id)
}

pub fn check_list_parts_args(bucket: &str, object: &str, upload_id: &str) -> Result<()> {
    check_multipart_object_args(bucket, object, upload_id)
}

pub fn check_complete_multipart_args(bucket: &str, object: &str, upload_id: &str) -> Result<()> {
    check_multipart_object_args(bucket, object, upload_id)
}

pub fn check_abort_multipart_args(bucket: &str, object: &str, upload_id: &str) -> Result<()> {
    check_multipart_object_args(bucket, object, upload_id)
}

pub fn check_list_multipart_args(bucket: &str, prefix: &str) -> Result<()> {
    if !is_valid_bucket_name(bucket) {
        return Err(StorageError::BucketNameInvalid(bucket.to_owned()));
    }

    if !is_valid_object_prefix(prefix) {
        return Err(StorageError::ObjectNameInvalid(bucket.to_owned(), prefix.to_owned()));
    }

    Ok(())
}

pub fn check_get_object_args(bucket: &str, object: &str) -> Result<()> {
    check_bucket_and_object_names(bucket, object)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_names() {
        assert!(is_valid_bucket_name("my-bucket"));
        assert!(is_valid_bucket_name("bucket.01"));
        assert!(!is_valid_bucket_name("ab"));
        assert!(!is_valid_bucket_name("-bucket"));
        assert!(!is_valid_bucket_name("bucket-"));
        assert!(!is_valid_bucket_name("my..bucket"));
        assert!(!is_valid_bucket_name("192.168.1.1"));
        assert!(!is_valid_bucket_name(&"x".repeat(64)));
    }

    #[test]
    fn test_object_names() {
        assert!(is_valid_object_name("a"));
        assert!(is_valid_object_name("a/b/c.txt"));
        assert!(!is_valid_object_name(""));
        assert!(!is_valid_object_name("/a"));
        assert!(!is_valid_object_name("a/../b"));
        assert!(!is_valid_object_name(&"x".repeat(1025)));
    }

    #[test]
    fn test_check_args() {
        assert!(matches!(
            check_new_multipart_args("x", "obj"),
            Err(StorageError::BucketNameInvalid(_))
        ));
        assert!(matches!(
            check_put_object_part_args("bucket", "", "id"),
            Err(StorageError::ObjectNameInvalid(_, _))
        ));
        assert!(matches!(
            check_complete_multipart_args("bucket", "obj", ""),
            Err(StorageError::InvalidUploadID(_, _, _))
        ));
        assert!(check_abort_multipart_args("bucket", "obj", "id").is_ok());
    }
}
