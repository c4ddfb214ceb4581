pub mod category;
pub mod course;
pub mod enrollment;
pub mod review;

pub use category::Category;
pub use course::{Course, CourseFilter, NewCourseRequest, TopRatedCourse};
pub use enrollment::ActiveEnrollment;
pub use review::ReviewWithAuthor;
