//! SSH and SCP command construction for remote locations.

use std::ffi::OsString;

use camino::Utf8Path;

use crate::command::CommandLine;
use crate::config::FixtureConfig;

use super::remote_word;
use super::util::expand_tilde;

/// Builds `ssh` and `scp` invocations from the configured options.
#[derive(Clone, Copy, Debug)]
pub struct SshTransport<'a> {
    config: &'a FixtureConfig,
}

impl<'a> SshTransport<'a> {
    /// Wraps the configuration holding the SSH settings.
    #[must_use]
    pub const fn new(config: &'a FixtureConfig) -> Self {
        Self { config }
    }

    /// Command running `remote_command` on `host` through the remote shell.
    ///
    /// `remote_command` is passed verbatim; callers escape its words.
    #[must_use]
    pub fn remote(&self, host: &str, remote_command: &str) -> CommandLine {
        let mut args = self.common_options("-p");
        args.push(OsString::from(host));
        args.push(OsString::from(remote_command));
        CommandLine::new(self.config.ssh_bin.as_str(), args)
    }

    /// Command copying a local file to `destination` on `host`.
    ///
    /// The SFTP protocol takes `destination` literally. With
    /// `scp_legacy_protocol` the remote shell parses it, so it is quoted the
    /// same way as the paths in [`SshTransport::remote`] commands.
    #[must_use]
    pub fn copy_to(&self, source: &Utf8Path, host: &str, destination: &str) -> CommandLine {
        let mut args = self.common_options("-P");
        args.push(OsString::from("-q"));
        let destination = if self.config.scp_legacy_protocol {
            args.push(OsString::from("-O"));
            remote_word(destination)
        } else {
            destination.to_owned()
        };
        args.push(OsString::from(source.as_str()));
        args.push(OsString::from(format!("{host}:{destination}")));
        CommandLine::new(self.config.scp_bin.as_str(), args)
    }

    fn common_options(&self, port_flag: &str) -> Vec<OsString> {
        let mut args = Vec::new();

        if let Some(port) = self.config.ssh_port {
            args.push(OsString::from(port_flag));
            args.push(OsString::from(port.to_string()));
        }

        if let Some(ref identity_file) = self.config.ssh_identity_file {
            args.push(OsString::from("-i"));
            args.push(OsString::from(expand_tilde(identity_file)));
        }

        if self.config.ssh_batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        if !self.config.ssh_strict_host_key_checking {
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
        }

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.ssh_known_hosts_file
            )));
        }

        args
    }
}
