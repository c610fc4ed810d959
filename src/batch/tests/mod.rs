//! Behaviour tests for BatchDownloader, grouped by domain.

use super::test_helpers::*;
use crate::error::{Error, QueueError, RunError};
use crate::metadata::CollectionListing;
use crate::types::*;
use std::time::Duration;

mod control;
