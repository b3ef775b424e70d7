pub mod cv;
pub mod user;

pub use cv::{
    BasicInfo, CvDraft, CvId, Education, Experience, ImageSource, ImageUpload, Layout,
    ListSection, Project, ScalarSection, SectionItem, Skill, SocialProfile, TextFields,
};
pub use user::{AuthResponse, LoginRequest, RegisterRequest, User};
