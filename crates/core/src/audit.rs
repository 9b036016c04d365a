//! Operation-log vocabulary.
//!
//! Action and module codes are stored verbatim in `operation_logs`; the
//! labels are served by the log vocabulary endpoints for display.

use serde::Serialize;

// Actions
pub const ACTION_LOGIN: &str = "login";
pub const ACTION_LOGOUT: &str = "logout";
pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_UPLOAD: &str = "upload";
pub const ACTION_DOWNLOAD: &str = "download";
pub const ACTION_REVIEW: &str = "review";
pub const ACTION_ARCHIVE: &str = "archive";
pub const ACTION_ADD_MEMBER: &str = "add_member";
pub const ACTION_REMOVE_MEMBER: &str = "remove_member";
pub const ACTION_UPDATE_PHASE: &str = "update_phase";
pub const ACTION_UPDATE_STATUS: &str = "update_status";
pub const ACTION_CHANGE_PASSWORD: &str = "change_password";
pub const ACTION_RESET_PASSWORD: &str = "reset_password";
pub const ACTION_NEW_VERSION: &str = "new_version";
pub const ACTION_IMPORT: &str = "import";

// Modules
pub const MODULE_AUTH: &str = "auth";
pub const MODULE_USER: &str = "user";
pub const MODULE_PROJECT: &str = "project";
pub const MODULE_TASK: &str = "task";
pub const MODULE_DOCUMENT: &str = "document";
pub const MODULE_KNOWLEDGE: &str = "knowledge";
pub const MODULE_CONTRACT: &str = "contract";
pub const MODULE_EXPENSE: &str = "expense";

// Outcomes
pub const RESULT_SUCCESS: &str = "success";
pub const RESULT_FAILED: &str = "failed";

/// A code with its display label.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Label {
    pub value: &'static str,
    pub label: &'static str,
}

const fn label(value: &'static str, label: &'static str) -> Label {
    Label { value, label }
}

pub const ACTIONS: &[Label] = &[
    label(ACTION_LOGIN, "登录"),
    label(ACTION_LOGOUT, "退出"),
    label(ACTION_CREATE, "创建"),
    label(ACTION_UPDATE, "更新"),
    label(ACTION_DELETE, "删除"),
    label(ACTION_UPLOAD, "上传"),
    label(ACTION_DOWNLOAD, "下载"),
    label(ACTION_REVIEW, "审核"),
    label(ACTION_ARCHIVE, "归档"),
    label(ACTION_ADD_MEMBER, "添加成员"),
    label(ACTION_REMOVE_MEMBER, "移除成员"),
    label(ACTION_UPDATE_PHASE, "更新阶段"),
    label(ACTION_UPDATE_STATUS, "更新状态"),
    label(ACTION_CHANGE_PASSWORD, "修改密码"),
    label(ACTION_RESET_PASSWORD, "重置密码"),
    label(ACTION_NEW_VERSION, "上传新版本"),
    label(ACTION_IMPORT, "导入"),
];

pub const MODULES: &[Label] = &[
    label(MODULE_AUTH, "认证"),
    label(MODULE_USER, "用户管理"),
    label(MODULE_PROJECT, "项目管理"),
    label(MODULE_TASK, "任务管理"),
    label(MODULE_DOCUMENT, "文档管理"),
    label(MODULE_KNOWLEDGE, "知识库"),
    label(MODULE_CONTRACT, "合同管理"),
    label(MODULE_EXPENSE, "费用管理"),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn action_codes_are_unique() {
        let codes: HashSet<_> = ACTIONS.iter().map(|l| l.value).collect();
        assert_eq!(codes.len(), ACTIONS.len());
    }

    #[test]
    fn module_codes_are_unique() {
        let codes: HashSet<_> = MODULES.iter().map(|l| l.value).collect();
        assert_eq!(codes.len(), MODULES.len());
    }
}
