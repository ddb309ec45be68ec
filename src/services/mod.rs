pub mod candidate_service;
pub mod email_service;
pub mod normalizer;
pub mod notification_service;
pub mod scoring_service;
