//! Error hierarchy for the chroot resolver.

error_chain! {
    foreign_links {
        Io(::std::io::Error);
    }

    errors {
        EmptyPath {
            description("path is empty")
            display("path is empty")
        }

        BadRoot(detail: String) {
            description("root could not be resolved to an absolute path")
            display("bad root: {}", detail)
        }

        BrokenPath(path: ::std::path::PathBuf) {
            description("a non-leaf path component does not exist")
            display("broken path: {:?}", path)
        }

        SymlinkLoop(path: ::std::path::PathBuf) {
            description("too many symlinks while resolving path")
            display("symlink loop while resolving {:?}", path)
        }

        IOFailure(detail: String) {
            description("underlying syscall failed")
            display("io failure: {}", detail)
        }
    }
}
