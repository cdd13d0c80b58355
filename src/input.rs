//! X11 输入引擎
//!
//! - 状态查询: QueryPointer (左键 / Shift), GetInputFocus (前台窗口),
//!   XFixes GetCursorImage (光标是否可见)
//! - 点击注入: SendEvent 定向投递到目标窗口, 或 XTEST 伪造输入
//!
//! 回放与录制只依赖 `InputBackend` trait, 测试中用脚本化实现替代。

use anyhow::Result;
use serde::Deserialize;

// =====================================================================
// 类型
// =====================================================================

/// 前台窗口标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub window: u32,
    /// WM_CLASS 的 instance 与 class 两部分
    pub class: Vec<String>,
    pub title: String,
}

/// 目标窗口匹配规则 (所有已配置字段都要匹配)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TargetMatcher {
    /// WM_CLASS 任一部分以此开头即匹配, 不区分大小写
    /// (LWJGL2 的 class 可能带版本号, 如 "Minecraft 1.8.9")
    pub class: Option<String>,
    /// 标题子串
    pub title: Option<String>,
}

impl Default for TargetMatcher {
    fn default() -> Self {
        Self {
            class: Some("Minecraft".to_string()),
            title: None,
        }
    }
}

impl TargetMatcher {
    pub fn matches(&self, target: &Target) -> bool {
        let class_ok = self.class.as_ref().map_or(true, |want| {
            let want = want.to_ascii_lowercase();
            target
                .class
                .iter()
                .any(|c| c.to_ascii_lowercase().starts_with(&want))
        });
        let title_ok = self
            .title
            .as_ref()
            .map_or(true, |want| target.title.contains(want.as_str()));
        class_ok && title_ok
    }
}

impl std::fmt::Display for TargetMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.class, &self.title) {
            (Some(c), Some(t)) => write!(f, "class={c} title~{t:?}"),
            (Some(c), None) => write!(f, "class={c}"),
            (None, Some(t)) => write!(f, "title~{t:?}"),
            (None, None) => write!(f, "任意窗口"),
        }
    }
}

/// 点击注入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectMode {
    /// 定向投递到目标窗口
    #[default]
    SendEvent,
    /// 服务器级伪造输入
    Xtest,
}

/// 输入状态查询 + 点击注入
pub trait InputBackend {
    /// 鼠标左键是否按住
    fn button_held(&mut self) -> Result<bool>;
    /// 修饰键 (Shift) 是否按住
    fn modifier_held(&mut self) -> Result<bool>;
    /// 光标是否可见 (游戏内通常隐藏)
    fn pointer_visible(&mut self) -> Result<bool>;
    /// 当前前台窗口
    fn foreground_target(&mut self) -> Result<Option<Target>>;
    fn inject_press(&mut self, target: &Target) -> Result<()>;
    fn inject_release(&mut self, target: &Target) -> Result<()>;
}

// =====================================================================
// X11Engine
// =====================================================================

#[cfg(target_os = "linux")]
pub use x11::X11Engine;

#[cfg(target_os = "linux")]
mod x11 {
    use super::{InjectMode, InputBackend, Target};
    use anyhow::{Context, Result};
    use tracing::{debug, info};
    use x11rb::connection::Connection;
    use x11rb::protocol::xfixes::ConnectionExt as _;
    use x11rb::protocol::xproto::{
        Atom, AtomEnum, ButtonPressEvent, ConnectionExt as _, EventMask, KeyButMask, Window,
        BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT,
    };
    use x11rb::protocol::xtest::ConnectionExt as _;
    use x11rb::rust_connection::RustConnection;

    /// 左键
    const BUTTON_LEFT: u8 = 1;
    /// 向上查找带 WM_CLASS 的父窗口的最大层数
    const MAX_PARENT_WALK: usize = 16;

    pub struct X11Engine {
        conn: RustConnection,
        root: Window,
        mode: InjectMode,
        net_wm_name: Atom,
        utf8_string: Atom,
    }

    impl X11Engine {
        /// 连接 X server (读取 DISPLAY)
        pub fn new(mode: InjectMode) -> Result<Self> {
            info!("🎮 初始化 X11 输入引擎...");
            let (conn, screen_num) =
                x11rb::connect(None).context("连接 X server 失败 (检查 DISPLAY)")?;
            let root = conn.setup().roots[screen_num].root;

            conn.xfixes_query_version(5, 0)?
                .reply()
                .context("X server 不支持 XFixes")?;
            if mode == InjectMode::Xtest {
                conn.xtest_get_version(2, 2)?
                    .reply()
                    .context("X server 不支持 XTEST")?;
            }

            let net_wm_name = conn.intern_atom(false, b"_NET_WM_NAME")?.reply()?.atom;
            let utf8_string = conn.intern_atom(false, b"UTF8_STRING")?.reply()?.atom;

            info!("✅ X11 输入引擎就绪 (注入方式: {mode:?})");
            Ok(Self {
                conn,
                root,
                mode,
                net_wm_name,
                utf8_string,
            })
        }

        fn pointer_mask(&self) -> Result<KeyButMask> {
            Ok(self.conn.query_pointer(self.root)?.reply()?.mask)
        }

        fn property(&self, window: Window, prop: Atom, ty: Atom) -> Result<Vec<u8>> {
            let reply = self
                .conn
                .get_property(false, window, prop, ty, 0, 1024)?
                .reply()?;
            Ok(reply.value)
        }

        fn describe(&self, window: Window) -> Result<Option<Target>> {
            let raw = self.property(window, AtomEnum::WM_CLASS.into(), AtomEnum::STRING.into())?;
            if raw.is_empty() {
                return Ok(None);
            }
            let class = raw
                .split(|b| *b == 0)
                .filter(|part| !part.is_empty())
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect();

            let mut title = self.property(window, self.net_wm_name, self.utf8_string)?;
            if title.is_empty() {
                title = self.property(window, AtomEnum::WM_NAME.into(), AtomEnum::ANY.into())?;
            }
            Ok(Some(Target {
                window,
                class,
                title: String::from_utf8_lossy(&title).into_owned(),
            }))
        }

        fn send_button(&self, target: &Target, press: bool) -> Result<()> {
            match self.mode {
                InjectMode::SendEvent => {
                    let pointer = self.conn.query_pointer(target.window)?.reply()?;
                    let (response_type, state, mask) = if press {
                        (BUTTON_PRESS_EVENT, KeyButMask::from(0u16), EventMask::BUTTON_PRESS)
                    } else {
                        (BUTTON_RELEASE_EVENT, KeyButMask::BUTTON1, EventMask::BUTTON_RELEASE)
                    };
                    let event = ButtonPressEvent {
                        response_type,
                        detail: BUTTON_LEFT,
                        sequence: 0,
                        time: x11rb::CURRENT_TIME,
                        root: self.root,
                        event: target.window,
                        child: x11rb::NONE,
                        root_x: pointer.root_x,
                        root_y: pointer.root_y,
                        event_x: pointer.win_x,
                        event_y: pointer.win_y,
                        state,
                        same_screen: true,
                    };
                    self.conn.send_event(true, target.window, mask, event)?;
                }
                InjectMode::Xtest => {
                    let kind = if press { BUTTON_PRESS_EVENT } else { BUTTON_RELEASE_EVENT };
                    self.conn.xtest_fake_input(
                        kind,
                        BUTTON_LEFT,
                        x11rb::CURRENT_TIME,
                        x11rb::NONE,
                        0,
                        0,
                        0,
                    )?;
                }
            }
            self.conn.flush()?;
            Ok(())
        }
    }

    impl InputBackend for X11Engine {
        fn button_held(&mut self) -> Result<bool> {
            Ok(self.pointer_mask()?.contains(KeyButMask::BUTTON1))
        }

        fn modifier_held(&mut self) -> Result<bool> {
            Ok(self.pointer_mask()?.contains(KeyButMask::SHIFT))
        }

        fn pointer_visible(&mut self) -> Result<bool> {
            let image = self.conn.xfixes_get_cursor_image()?.reply()?;
            // ARGB, 全透明即视为隐藏
            Ok(image.cursor_image.iter().any(|px| px >> 24 != 0))
        }

        fn foreground_target(&mut self) -> Result<Option<Target>> {
            let mut window = self.conn.get_input_focus()?.reply()?.focus;
            // 0 = None, 1 = PointerRoot
            if window <= 1 {
                return Ok(None);
            }
            for _ in 0..MAX_PARENT_WALK {
                if let Some(target) = self.describe(window)? {
                    return Ok(Some(target));
                }
                let tree = self.conn.query_tree(window)?.reply()?;
                if tree.parent == x11rb::NONE || tree.parent == tree.root {
                    break;
                }
                window = tree.parent;
            }
            debug!("前台窗口 {window:#x} 没有 WM_CLASS");
            Ok(None)
        }

        fn inject_press(&mut self, target: &Target) -> Result<()> {
            self.send_button(target, true)
        }

        fn inject_release(&mut self, target: &Target) -> Result<()> {
            self.send_button(target, false)
        }
    }
}
