// SPDX-License-Identifier: MIT
//
// tp-term: terminal engine for termpaint.
//
// Everything between raw terminal bytes and the painting application:
// an input parser for keys, SGR mouse reports and cursor-position
// replies; a frame buffer of styled cells; a differential renderer that
// emits only changed cells; byte readers for a local TTY or a socket;
// and an event loop that ties them together for one session.
//
// The same loop drives a local terminal (stdin/stdout in raw mode) and a
// remote one (a TCP stream whose peer terminal is already in raw mode).
// Nothing here knows about canvases or tools.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod diff;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;
