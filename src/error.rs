// 该文件是 Tianma （天马） 项目的一部分。
// src/error.rs - 错误码定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! 错误码表与错误值。
//!
//! 错误值只携带类别、数字码与消息，构造时不产生任何副作用；
//! 日志由调用方负责输出。

use std::fmt;

use serde::Serialize;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorKind {
  /// HTTP 状态码错误
  Http,
  /// 输入校验错误
  Valid,
  /// 系统错误
  System,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::Http => "HTTP",
      ErrorKind::Valid => "VALID",
      ErrorKind::System => "SYSTEM",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 错误码表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
  pub kind: ErrorKind,
  pub code: u16,
  pub desc: &'static str,
  /// 前端跳转提示（"back"、"reload"、路径或空）
  pub url: &'static str,
}

const fn valid(code: u16, desc: &'static str, url: &'static str) -> ErrorCode {
  ErrorCode {
    kind: ErrorKind::Valid,
    code,
    desc,
    url,
  }
}

const fn http(code: u16, desc: &'static str, url: &'static str) -> ErrorCode {
  ErrorCode {
    kind: ErrorKind::Http,
    code,
    desc,
    url,
  }
}

pub const USER_ERROR: u16 = 1000;
pub const PARAMETER_ERROR: u16 = 1018;
pub const MODEL_NOT_FOUND: u16 = 1020;
pub const SYSTEM_ERROR: u16 = 3000;
pub const IMAGE_NOT_FOUND: u16 = 4001;
pub const INVALID_IMAGE_TYPE: u16 = 4002;
pub const IMAGE_LOAD_FAILED: u16 = 4003;

// 按码值升序排列
static CUSTOM_ERROR_CODES: &[ErrorCode] = &[
  valid(1000, "User Error", ""),
  valid(1001, "No permission", ""),
  valid(1002, "Data not found!", ""),
  valid(1003, "No access permission", "back"),
  valid(1004, "No access to project", "back"),
  valid(1005, "An error occurred while running analysis", ""),
  valid(1006, "Please check the cluster parameter value", ""),
  valid(1007, "user_id is required.", "back"),
  valid(1008, "Fail to create project, user missing.", ""),
  valid(1009, "The file is in use and cannot be deleted.", ""),
  valid(1010, "Already a registered email.", ""),
  valid(1011, "The number of registered email has been exceeded.", ""),
  valid(1012, "User information does not exist.", ""),
  valid(1013, "This email has been suspended or deleted.", "reload"),
  valid(
    1014,
    "Your password fails 5 times, your account will be suspended for 10 minutes.",
    "/",
  ),
  valid(
    1015,
    "Your email or password is incorrect. If you fail 5 times, your account will be suspended for 10 minutes.",
    "reload",
  ),
  valid(1016, "Your password is incorrect.", "reload"),
  valid(1017, "Please check the cluster parameter value.", ""),
  valid(1018, "Parameter value Error", ""),
  valid(1019, "Device name not found", ""),
  valid(1020, "Model not found", ""),
  ErrorCode {
    kind: ErrorKind::System,
    code: 3000,
    desc: "SYSTEM Error",
    url: "back",
  },
  valid(4001, "Image not found", ""),
  valid(4002, "Only image files can be uploaded", ""),
  valid(4003, "Failed to load image", ""),
];

static HTTP_STATUS_CODES: &[ErrorCode] = &[
  http(100, "HTTP_100_CONTINUE", ""),
  http(101, "HTTP_101_SWITCHING_PROTOCOLS", ""),
  http(200, "HTTP_200_OK", ""),
  http(201, "HTTP_201_CREATED", ""),
  http(202, "HTTP_202_ACCEPTED", ""),
  http(203, "HTTP_203_NON_AUTHORITATIVE_INFORMATION", ""),
  http(204, "HTTP_204_NO_CONTENT", ""),
  http(205, "HTTP_205_RESET_CONTENT", ""),
  http(206, "HTTP_206_PARTIAL_CONTENT", ""),
  http(207, "HTTP_207_MULTI_STATUS", ""),
  http(300, "HTTP_300_MULTIPLE_CHOICES", ""),
  http(301, "HTTP_301_MOVED_PERMANENTLY", ""),
  http(302, "HTTP_302_FOUND", ""),
  http(303, "HTTP_303_SEE_OTHER", ""),
  http(304, "HTTP_304_NOT_MODIFIED", ""),
  http(305, "HTTP_305_USE_PROXY", ""),
  http(306, "HTTP_306_RESERVED", ""),
  http(307, "HTTP_307_TEMPORARY_REDIRECT", ""),
  http(400, "HTTP_400_BAD_REQUEST", ""),
  http(401, "HTTP_401_UNAUTHORIZED", "back"),
  http(402, "HTTP_402_PAYMENT_REQUIRED", ""),
  http(403, "HTTP_403_FORBIDDEN", "back"),
  http(404, "HTTP_404_NOT_FOUND", ""),
  http(405, "HTTP_405_METHOD_NOT_ALLOWED", ""),
  http(406, "HTTP_406_NOT_ACCEPTABLE", ""),
  http(407, "HTTP_407_PROXY_AUTHENTICATION_REQUIRED", ""),
  http(408, "HTTP_408_REQUEST_TIMEOUT", ""),
  http(409, "HTTP_409_CONFLICT", ""),
  http(410, "HTTP_410_GONE", ""),
  http(411, "HTTP_411_LENGTH_REQUIRED", ""),
  http(412, "HTTP_412_PRECONDITION_FAILED", ""),
  http(413, "HTTP_413_REQUEST_ENTITY_TOO_LARGE", ""),
  http(414, "HTTP_414_REQUEST_URI_TOO_LONG", ""),
  http(415, "HTTP_415_UNSUPPORTED_MEDIA_TYPE", ""),
  http(416, "HTTP_416_REQUESTED_RANGE_NOT_SATISFIABLE", ""),
  http(417, "HTTP_417_EXPECTATION_FAILED", ""),
  http(422, "HTTP_422_UNPROCESSABLE_ENTITY", ""),
  http(423, "HTTP_423_LOCKED", ""),
  http(424, "HTTP_424_FAILED_DEPENDENCY", ""),
  http(425, "HTTP_425_TOO_EARLY", ""),
  http(428, "HTTP_428_PRECONDITION_REQUIRED", ""),
  http(429, "HTTP_429_TOO_MANY_REQUESTS", ""),
  http(431, "HTTP_431_REQUEST_HEADER_FIELDS_TOO_LARGE", ""),
  http(451, "HTTP_451_UNAVAILABLE_FOR_LEGAL_REASONS", ""),
  http(500, "HTTP_500_INTERNAL_SERVER_ERROR", ""),
  http(501, "HTTP_501_NOT_IMPLEMENTED", ""),
  http(502, "HTTP_502_BAD_GATEWAY", ""),
  http(503, "HTTP_503_SERVICE_UNAVAILABLE", ""),
  http(504, "HTTP_504_GATEWAY_TIMEOUT", ""),
  http(505, "HTTP_505_HTTP_VERSION_NOT_SUPPORTED", ""),
  http(507, "HTTP_507_INSUFFICIENT_STORAGE", ""),
  http(511, "HTTP_511_NETWORK_AUTHENTICATION_REQUIRED", ""),
];

fn search(table: &'static [ErrorCode], code: u16) -> Option<&'static ErrorCode> {
  table
    .binary_search_by_key(&code, |entry| entry.code)
    .ok()
    .map(|idx| &table[idx])
}

/// 查询自定义错误码
pub fn custom_error(code: u16) -> Option<&'static ErrorCode> {
  search(CUSTOM_ERROR_CODES, code)
}

/// 查询 HTTP 状态码
pub fn http_error(code: u16) -> Option<&'static ErrorCode> {
  search(HTTP_STATUS_CODES, code)
}

/// 按类别查询：HTTP 类查状态码表，其余查自定义表
pub fn lookup(kind: ErrorKind, code: u16) -> Option<&'static ErrorCode> {
  match kind {
    ErrorKind::Http => http_error(code),
    ErrorKind::Valid | ErrorKind::System => custom_error(code),
  }
}

/// 通用错误值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
  pub kind: ErrorKind,
  pub code: u16,
  pub msg: String,
}

impl AppError {
  pub fn new(kind: ErrorKind, code: u16, msg: impl Into<String>) -> Self {
    Self {
      kind,
      code,
      msg: msg.into(),
    }
  }

  pub fn valid(code: u16, msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::Valid, code, msg)
  }

  pub fn system(msg: impl Into<String>) -> Self {
    Self::new(ErrorKind::System, SYSTEM_ERROR, msg)
  }

  /// 表中存在该码时返回表内描述，否则返回调用方给出的消息
  pub fn describe(&self) -> &str {
    match lookup(self.kind, self.code) {
      Some(entry) => entry.desc,
      None => &self.msg,
    }
  }
}

impl fmt::Display for AppError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} : {} : {}", self.kind, self.code, self.describe())
  }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tables_are_sorted_for_binary_search() {
    for table in [CUSTOM_ERROR_CODES, HTTP_STATUS_CODES] {
      assert!(table.windows(2).all(|w| w[0].code < w[1].code));
    }
  }

  #[test]
  fn lookup_dispatches_on_kind() {
    assert_eq!(
      lookup(ErrorKind::Http, 413).map(|e| e.desc),
      Some("HTTP_413_REQUEST_ENTITY_TOO_LARGE")
    );
    assert_eq!(
      lookup(ErrorKind::Valid, IMAGE_NOT_FOUND).map(|e| e.desc),
      Some("Image not found")
    );
    assert_eq!(custom_error(SYSTEM_ERROR).map(|e| e.kind), Some(ErrorKind::System));
    assert_eq!(custom_error(1003).map(|e| e.url), Some("back"));
    assert!(lookup(ErrorKind::Http, 1000).is_none());
    assert!(custom_error(9999).is_none());
  }

  #[test]
  fn unknown_code_falls_back_to_message() {
    let known = AppError::valid(IMAGE_NOT_FOUND, "cannot open a.png");
    assert_eq!(known.describe(), "Image not found");
    assert_eq!(known.to_string(), "VALID : 4001 : Image not found");

    let unknown = AppError::valid(4999, "something odd");
    assert_eq!(unknown.describe(), "something odd");
  }
}
