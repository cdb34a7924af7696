pub mod attendance_service;
pub mod locks;
pub mod mail_service;
pub mod matching;
pub mod registration_service;
