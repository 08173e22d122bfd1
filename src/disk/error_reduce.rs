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

use super::error::Error;

pub static OBJECT_OP_IGNORED_ERRS: &[Error] = &[Error::DiskNotFound, Error::FaultyDisk, Error::DiskAccessDenied];

pub static BUCKET_OP_IGNORED_ERRS: &[Error] = &[Error::DiskNotFound, Error::FaultyDisk, Error::DiskAccessDenied];

pub fn reduce_write_quorum_errs(errors: &[Option<Error>], ignored_errs: &[Error], quorum: usize) -> Option<Error> {
    reduce_quorum_errs(errors, ignored_errs, quorum, Error::ErasureWriteQuorum)
}

pub fn reduce_read_quorum_errs(errors: &[Option<Error>], ignored_errs: &[Error], quorum: usize) -> Option<Error> {
    reduce_quorum_errs(errors, ignored_errs, quorum, Error::ErasureReadQuorum)
}

/// Distills a per-disk error vector to a single representative error: the
/// value with the largest agreeing count, provided that count reaches quorum.
pub fn reduce_quorum_errs(errors: &[Option<Error>], ignored_errs: &[Error], quorum: usize, quorum_err: Error) -> Option<Error> {
    let (max_count, err) = reduce_errs(errors, ignored_errs);
    if max_count >= quorum { err } else { Some(quorum_err) }
}

/// Returns the most frequent entry of the vector along with its count.
/// `None` slots (success) participate and win ties against any error.
pub fn reduce_errs(errors: &[Option<Error>], ignored_errs: &[Error]) -> (usize, Option<Error>) {
    let nil_count = errors.iter().filter(|e| e.is_none()).count();

    let err_counts = errors
        .iter()
        .filter_map(|e| e.as_ref())
        .fold(std::collections::HashMap::new(), |mut acc, e| {
            if is_ignored_err(ignored_errs, e) {
                return acc;
            }
            *acc.entry(e.clone()).or_insert(0) += 1;
            acc
        });

    let (best_err, best_count) = err_counts
        .into_iter()
        .max_by(|(_, c1), (_, c2)| c1.cmp(c2))
        .unwrap_or((Error::Unexpected, 0));

    if nil_count >= best_count && nil_count > 0 {
        (nil_count, None)
    } else {
        (best_count, Some(best_err))
    }
}

pub fn is_ignored_err(ignored_errs: &[Error], err: &Error) -> bool {
    ignored_errs.iter().any(|e| e == err)
}

pub fn count_errs(errors: &[Option<Error>], err: &Error) -> usize {
    errors.iter().filter(|&e| e.as_ref() == Some(err)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_io(msg: &str) -> Error {
        Error::Io(std::io::Error::other(msg))
    }

    #[test]
    fn test_reduce_errs_basic() {
        let e1 = err_io("a");
        let e2 = err_io("b");
        let errors = vec![Some(e1.clone()), Some(e1.clone()), Some(e2.clone()), None];
        let (count, err) = reduce_errs(&errors, &[]);
        assert_eq!(count, 2);
        assert_eq!(err, Some(e1));
    }

    #[test]
    fn test_reduce_errs_ignored() {
        let e1 = err_io("a");
        let errors = vec![
            Some(e1.clone()),
            Some(Error::DiskNotFound),
            Some(e1.clone()),
            Some(Error::DiskNotFound),
            None,
        ];
        let ignored = vec![Error::DiskNotFound];
        let (count, err) = reduce_errs(&errors, &ignored);
        assert_eq!(count, 2);
        assert_eq!(err, Some(e1));
    }

    #[test]
    fn test_reduce_errs_nil_tiebreak() {
        let e1 = err_io("a");
        let errors = vec![Some(e1.clone()), None, Some(e1.clone()), None];
        let (count, err) = reduce_errs(&errors, &[]);
        assert_eq!(count, 2);
        assert_eq!(err, None);
    }

    #[test]
    fn test_reduce_quorum_errs() {
        let e1 = err_io("a");
        let e2 = err_io("b");
        let errors = vec![Some(e1.clone()), Some(e1.clone()), Some(e2.clone()), None];
        let res = reduce_quorum_errs(&errors, &[], 2, Error::FaultyDisk);
        assert_eq!(res, Some(e1));
        let res = reduce_quorum_errs(&errors, &[], 3, Error::FaultyDisk);
        assert_eq!(res, Some(Error::FaultyDisk));
    }

    #[test]
    fn test_count_errs() {
        let e1 = err_io("a");
        let e2 = err_io("b");
        let errors = vec![Some(e1.clone()), Some(e2.clone()), Some(e1.clone()), None];
        assert_eq!(count_errs(&errors, &e1), 2);
        assert_eq!(count_errs(&errors, &e2), 1);
    }
}
