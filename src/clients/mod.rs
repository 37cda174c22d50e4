pub mod dynamodb;
pub mod memory;
pub mod rekognition;
pub mod s3;

pub use dynamodb::{DynamoRecordStore, RecordStore, RecordStoreError};
pub use rekognition::{FaceMatch, FaceMatcher, IndexedFace, MatcherError, RekognitionMatcher};
pub use s3::{ObjectStore, ObjectStoreError, S3ObjectStore};
