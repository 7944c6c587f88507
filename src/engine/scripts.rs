//! Scripts driving the cooperative render protocol.
//!
//! Content under test waits for `window._renderStarted` before it renders
//! its output and sets `window._renderFinished` once the output is final.

/// Installed before every navigation. Exposes the protocol flags and keeps
/// an unpatched clock around as `performance._now`.
pub const INIT_SCRIPT: &str = r#"(() => {
	window._renderStarted = false;
	window._renderFinished = false;
	if ( performance._now === undefined ) {
		performance._now = performance.now.bind( performance );
	}
})();"#;

/// Evaluated after navigation, before waiting for the network to settle.
/// Hides page chrome that is not part of the rendered output.
pub const CLEAN_PAGE_SCRIPT: &str = r#"(() => {
	for ( const selector of [ '#info', '#overlay', '.lbl', '.dg', '#stats' ] ) {
		for ( const element of document.querySelectorAll( selector ) ) {
			element.style.display = 'none';
		}
	}
	document.body.style.overflow = 'hidden';
	return true;
})();"#;

/// Tells the content to start producing output.
pub const RENDER_START_SCRIPT: &str = "window._renderStarted = true; true;";

/// Truthy once the content has finished producing output.
pub const RENDER_FINISHED_PREDICATE: &str = "window._renderFinished === true";
