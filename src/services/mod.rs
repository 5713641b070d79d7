// 服务层
// 核心业务逻辑，只依赖注入的存储/缓存/队列抽象，不感知 HTTP

pub mod engagement;
pub mod feed;
pub mod follow;
pub mod post;
pub mod repository;
pub mod user;
