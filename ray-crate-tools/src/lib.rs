//! Ray 开发工具集
//!
//! 提供日志初始化、渲染器目录布局等通用工具。
//!
//! # RayPath
//! 基于渲染器根目录的统一路径管理，shader 源码、编译产物以及第三方工具链都从这里推导。

pub mod init_log;
pub mod resource;
